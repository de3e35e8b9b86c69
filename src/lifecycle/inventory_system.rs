use crate::batch::{BatchConfig, BatchOrchestrator};
use crate::store::{StoreActor, StoreClient};
use tracing::{error, info};

/// Owns the in-memory store actor and the orchestrator that talks to it.
///
/// `InventorySystem` is responsible for:
/// - **Lifecycle Management**: Spawning the store actor and stopping it on shutdown
/// - **Dependency Wiring**: Handing the orchestrator its store client
///
/// # Example
///
/// ```ignore
/// let system = InventorySystem::new(BatchConfig::from_env());
///
/// let result = system
///     .orchestrator
///     .adjust_inventory(&ctx, adjustments, None)
///     .await?;
///
/// system.shutdown().await?;
/// ```
pub struct InventorySystem {
    /// Direct handle for seeding and inspecting the store
    pub store_client: StoreClient,

    /// Batch entry point wired to the same store
    pub orchestrator: BatchOrchestrator<StoreClient>,

    handle: tokio::task::JoinHandle<()>,
}

impl InventorySystem {
    /// Spawns the store actor and builds an orchestrator with `config`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: BatchConfig) -> Self {
        let (store_actor, store_client) = StoreActor::with_sequential_ids(64);
        let handle = tokio::spawn(store_actor.run());
        let orchestrator = BatchOrchestrator::with_config(store_client.clone(), config);

        info!(?config, "Inventory system started");
        Self {
            store_client,
            orchestrator,
            handle,
        }
    }

    /// Drops every client so the store's channel closes, then waits for the actor to exit.
    ///
    /// Returns an error if the actor task panicked.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down inventory system...");

        drop(self.orchestrator);
        drop(self.store_client);

        if let Err(e) = self.handle.await {
            error!("Store task failed: {:?}", e);
            return Err(format!("Store task failed: {:?}", e));
        }

        info!("Inventory system shutdown complete.");
        Ok(())
    }
}
