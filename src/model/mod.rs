//! Pure data structures (DTOs) submitted as batch work items.

pub mod context;
pub mod inventory;
pub mod product;

pub use context::*;
pub use inventory::*;
pub use product::*;
