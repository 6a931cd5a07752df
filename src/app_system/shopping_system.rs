use tracing::{error, info, instrument};

use super::AppConfig;
use crate::gateway::ProductGateway;
use crate::store::{DocumentStore, StoreClient};

/// Starts the backend and wires the gateway to it.
///
/// The store client is kept public so callers can administer the backend,
/// e.g. change a collection's access rule.
pub struct ShoppingSystem {
    pub gateway: ProductGateway,
    pub store: StoreClient,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl ShoppingSystem {
    /// Start with the in-process store, random ids and the system clock.
    #[instrument(name = "shopping_system", skip(config), fields(collection = %config.collection))]
    pub fn new(config: &AppConfig) -> Self {
        info!("Starting shopping system");
        let (store, client) = DocumentStore::with_defaults(config.buffer_size);
        Self::with_store(config, store, client)
    }

    /// Start on a store built by the caller, e.g. one with a fixed clock.
    pub fn with_store(config: &AppConfig, store: DocumentStore, client: StoreClient) -> Self {
        let handles = vec![tokio::spawn(store.run())];
        let gateway = ProductGateway::new(client.clone(), config.collection.clone());

        info!("Shopping system started");
        Self {
            gateway,
            store: client,
            handles,
        }
    }

    /// Stops the store and waits for it. Unmount presenters first so their
    /// subscriptions close cleanly.
    #[instrument(skip(self))]
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down shopping system");

        if let Err(e) = self.store.shutdown().await {
            error!(error = %e, "Store already stopped");
        }

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Service shutdown error");
                return Err(format!("Store task failed: {e}"));
            }
        }

        info!("Shopping system shutdown complete");
        Ok(())
    }
}
