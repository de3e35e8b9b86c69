//! Chunk-size configuration for batch operations.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default chunk sizes per operation.
///
/// Multi-step operations (transfers) use small chunks; single-row updates use larger ones.
/// A `chunk_size` passed to an individual call overrides these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub update_chunk_size: usize,
    pub adjust_chunk_size: usize,
    pub transfer_chunk_size: usize,
    pub delete_chunk_size: usize,
    pub import_chunk_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            update_chunk_size: Self::DEFAULT_UPDATE_CHUNK_SIZE,
            adjust_chunk_size: Self::DEFAULT_ADJUST_CHUNK_SIZE,
            transfer_chunk_size: Self::DEFAULT_TRANSFER_CHUNK_SIZE,
            delete_chunk_size: Self::DEFAULT_DELETE_CHUNK_SIZE,
            import_chunk_size: Self::DEFAULT_IMPORT_CHUNK_SIZE,
        }
    }
}

impl BatchConfig {
    const DEFAULT_UPDATE_CHUNK_SIZE: usize = 20;
    const DEFAULT_ADJUST_CHUNK_SIZE: usize = 10;
    const DEFAULT_TRANSFER_CHUNK_SIZE: usize = 5;
    const DEFAULT_DELETE_CHUNK_SIZE: usize = 10;
    const DEFAULT_IMPORT_CHUNK_SIZE: usize = 20;

    /// Reads overrides from the environment, falling back to defaults.
    ///
    /// Environment variables:
    /// - `BATCH_UPDATE_CHUNK_SIZE`
    /// - `BATCH_ADJUST_CHUNK_SIZE`
    /// - `BATCH_TRANSFER_CHUNK_SIZE`
    /// - `BATCH_DELETE_CHUNK_SIZE`
    /// - `BATCH_IMPORT_CHUNK_SIZE`
    ///
    /// Unparseable or zero values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: usize| {
            let Some(raw) = lookup(key) else {
                return default;
            };
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    warn!(key, value = %raw, default, "Ignoring invalid chunk size");
                    default
                }
            }
        };

        Self {
            update_chunk_size: read("BATCH_UPDATE_CHUNK_SIZE", Self::DEFAULT_UPDATE_CHUNK_SIZE),
            adjust_chunk_size: read("BATCH_ADJUST_CHUNK_SIZE", Self::DEFAULT_ADJUST_CHUNK_SIZE),
            transfer_chunk_size: read(
                "BATCH_TRANSFER_CHUNK_SIZE",
                Self::DEFAULT_TRANSFER_CHUNK_SIZE,
            ),
            delete_chunk_size: read("BATCH_DELETE_CHUNK_SIZE", Self::DEFAULT_DELETE_CHUNK_SIZE),
            import_chunk_size: read("BATCH_IMPORT_CHUNK_SIZE", Self::DEFAULT_IMPORT_CHUNK_SIZE),
        }
    }
}
