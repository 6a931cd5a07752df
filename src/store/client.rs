use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use super::messages::{Access, Fields, Query, SnapshotSender, StoreRequest, WatchId};
use super::StoreError;

/// Generate client methods with oneshot channel boilerplate and automatic tracing.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident) => {
        impl $client {
            #[instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, StoreError> {
                debug!("Sending request");
                let (respond_to, response) = oneshot::channel();
                self.sender
                    .send($request::$variant {
                        $($param,)*
                        respond_to,
                    })
                    .await
                    .map_err(|_| StoreError::Unavailable("Store closed".to_string()))?;

                response
                    .await
                    .map_err(|_| StoreError::Unavailable("Store dropped request".to_string()))?
            }
        }
    };
}

/// Handle to a running [`DocumentStore`](super::DocumentStore).
#[derive(Clone, Debug)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("Sending shutdown request");
        self.sender
            .send(StoreRequest::Shutdown)
            .await
            .map_err(|_| StoreError::Unavailable("Store closed".to_string()))
    }

    /// Removes a watch without waiting for the store, for callers that cannot
    /// await. If the request cannot be queued, the store still drops the
    /// watcher once it sees the receiver is gone.
    pub fn release(&self, watch_id: WatchId) {
        let (respond_to, _) = oneshot::channel();
        if let Err(e) = self
            .sender
            .try_send(StoreRequest::Unwatch { watch_id, respond_to })
        {
            debug!(%watch_id, error = %e, "Release not queued");
        }
    }

    /// Resolves once the store has stopped accepting requests.
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

client_method!(StoreClient => fn add(collection: String, fields: Fields, stamp: Option<String>) -> String as StoreRequest::Add);
client_method!(StoreClient => fn update(collection: String, id: String, fields: Fields) -> () as StoreRequest::Update);
client_method!(StoreClient => fn delete(collection: String, id: String) -> () as StoreRequest::Delete);
client_method!(StoreClient => fn watch(query: Query, sender: SnapshotSender) -> WatchId as StoreRequest::Watch);
client_method!(StoreClient => fn unwatch(watch_id: WatchId) -> () as StoreRequest::Unwatch);
client_method!(StoreClient => fn set_access(collection: String, access: Access) -> () as StoreRequest::SetAccess);
