use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn, Instrument};

use super::SubscriptionError;
use crate::domain::Product;
use crate::store::{Document, SnapshotReceiver, StoreClient, WatchId};

/// Live, cancellable feed of complete product lists.
///
/// Each item is the whole collection as it stands after a change, newest
/// product first. A reader that falls behind gets the current list, not
/// every list in between. After a channel error or
/// [`unsubscribe`](Self::unsubscribe) the feed yields nothing more. Dropping
/// an active subscription releases its backend channel without waiting.
#[derive(Debug)]
pub struct ProductSubscription {
    watch_id: WatchId,
    store: StoreClient,
    /// `None` once the feed has ended.
    snapshots: Option<SnapshotReceiver>,
    last_error: Option<SubscriptionError>,
}

impl ProductSubscription {
    pub(crate) fn new(watch_id: WatchId, store: StoreClient, snapshots: SnapshotReceiver) -> Self {
        Self {
            watch_id,
            store,
            snapshots: Some(snapshots),
            last_error: None,
        }
    }

    pub fn watch_id(&self) -> WatchId {
        self.watch_id
    }

    pub fn is_active(&self) -> bool {
        self.snapshots.is_some()
    }

    /// The error that ended the feed, if it ended that way.
    pub fn last_error(&self) -> Option<&SubscriptionError> {
        self.last_error.as_ref()
    }

    /// Waits for the next complete list.
    ///
    /// Returns `None` once the feed has ended. A channel failure is logged and
    /// kept in [`last_error`](Self::last_error). Cancel safe.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Product>> {
        let snapshots = self.snapshots.as_mut()?;

        if snapshots.changed().await.is_err() {
            self.fail(SubscriptionError::Closed);
            return None;
        }
        let latest = snapshots.borrow_and_update().clone();

        match latest {
            Ok(documents) => {
                let products = decode_snapshot(documents);
                debug!(watch_id = %self.watch_id, product_count = products.len(), "Snapshot received");
                Some(products)
            }
            Err(e) => {
                self.fail(SubscriptionError::from(e));
                None
            }
        }
    }

    /// Stops delivery and releases the backend channel. Calling it again does
    /// nothing.
    #[instrument(fields(watch_id = %self.watch_id), skip(self))]
    pub async fn unsubscribe(&mut self) {
        if self.snapshots.take().is_none() {
            return;
        }

        match self.store.unwatch(self.watch_id).await {
            Ok(()) => info!("Product subscription closed"),
            // A stopped backend has already dropped the channel.
            Err(e) => debug!(error = %e, "Unwatch not delivered"),
        }
    }

    fn fail(&mut self, err: SubscriptionError) {
        error!(watch_id = %self.watch_id, error = %err, "Product subscription failed");
        self.snapshots = None;
        self.last_error = Some(err);
    }
}

impl Drop for ProductSubscription {
    fn drop(&mut self) {
        if self.snapshots.take().is_some() {
            debug!(watch_id = %self.watch_id, "Subscription dropped while active");
            self.store.release(self.watch_id);
        }
    }
}

type SnapshotCallback = Box<dyn FnMut(Vec<Product>) + Send>;
type ErrorCallback = Box<dyn FnOnce(SubscriptionError) + Send>;

struct Callbacks {
    on_snapshot: SnapshotCallback,
    on_error: ErrorCallback,
}

/// Background task driving a [`ProductSubscription`] into callbacks.
pub struct SubscriptionHandle {
    /// Cleared by `unsubscribe`; the task only calls back while holding the
    /// lock and finding them here.
    callbacks: Arc<Mutex<Option<Callbacks>>>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub(crate) fn spawn<F, E>(mut subscription: ProductSubscription, on_snapshot: F, on_error: E) -> Self
    where
        F: FnMut(Vec<Product>) + Send + 'static,
        E: FnOnce(SubscriptionError) + Send + 'static,
    {
        let callbacks = Arc::new(Mutex::new(Some(Callbacks {
            on_snapshot: Box::new(on_snapshot),
            on_error: Box::new(on_error),
        })));
        let shared = Arc::clone(&callbacks);
        let (cancel, mut cancelled) = oneshot::channel::<()>();
        let span = tracing::info_span!("product_subscription", watch_id = %subscription.watch_id());

        let task = tokio::spawn(
            async move {
                loop {
                    tokio::select! {
                        biased;
                        // Fires on an explicit cancel and when the handle is dropped.
                        _ = &mut cancelled => break,
                        next = subscription.next_snapshot() => {
                            if !deliver(&shared, next, subscription.last_error()) {
                                break;
                            }
                        }
                    }
                }
                subscription.unsubscribe().await;
            }
            .instrument(span),
        );

        Self {
            callbacks,
            cancel: Some(cancel),
            task,
        }
    }

    /// Stops further callbacks. Idempotent.
    ///
    /// Waits for a callback that is already running, so once this returns no
    /// callback runs again. Must not be called from inside a callback.
    pub fn unsubscribe(&mut self) {
        let disarmed = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(disarmed);

        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some() && !self.task.is_finished()
    }

    /// Waits for the background task to end, after a cancel or a channel
    /// failure.
    pub async fn closed(self) {
        let Self { cancel, task, .. } = self;
        // Keep the cancel side alive so waiting does not itself cancel.
        let _cancel = cancel;
        if let Err(e) = task.await {
            warn!(error = ?e, "Subscription task ended abnormally");
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Hands one feed item to the callbacks while holding their lock. Returns
/// false when nothing more should be delivered.
fn deliver(
    callbacks: &Mutex<Option<Callbacks>>,
    next: Option<Vec<Product>>,
    last_error: Option<&SubscriptionError>,
) -> bool {
    let mut guard = callbacks.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(armed) = guard.as_mut() else {
        return false;
    };

    match next {
        Some(products) => {
            (armed.on_snapshot)(products);
            true
        }
        None => {
            if let (Some(err), Some(armed)) = (last_error, guard.take()) {
                (armed.on_error)(err.clone());
            }
            false
        }
    }
}

/// Turns backend documents into products, skipping any that do not match the
/// product schema.
fn decode_snapshot(documents: Vec<Document>) -> Vec<Product> {
    documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.id;
            match serde_json::from_value::<Product>(Value::Object(doc.fields)) {
                Ok(mut product) => {
                    product.id = id;
                    Some(product)
                }
                Err(e) => {
                    warn!(document_id = %id, error = %e, "Skipping malformed product document");
                    None
                }
            }
        })
        .collect()
}
