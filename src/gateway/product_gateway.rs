use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use super::subscription::{ProductSubscription, SubscriptionHandle};
use super::{PersistenceError, SubscriptionError};
use crate::domain::{Product, ProductDraft, ProductPatch, FIELD_ADDED_AT, FIELD_PURCHASED};
use crate::store::{snapshot_channel, Direction, Fields, Query, StoreClient};

/// The application's only contact with the persistence backend.
///
/// Mutations return once the backend acknowledges the write. Their effect on
/// the list is never applied locally: it arrives with the next snapshot of
/// an open [`ProductSubscription`].
#[derive(Clone, Debug)]
pub struct ProductGateway {
    store: StoreClient,
    collection: String,
}

impl ProductGateway {
    pub fn new(store: StoreClient, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Adds a product, unpurchased, stamped with the backend's clock.
    /// Returns the id the backend assigned.
    #[instrument(fields(product_name = %draft.name), skip(self, draft))]
    pub async fn create(&self, draft: ProductDraft) -> Result<String, PersistenceError> {
        debug!("Sending create request");
        let mut fields = to_fields(&draft)?;
        fields.insert(FIELD_PURCHASED.to_string(), Value::Bool(false));

        let result = self
            .store
            .add(
                self.collection.clone(),
                fields,
                Some(FIELD_ADDED_AT.to_string()),
            )
            .await;

        match result {
            Ok(id) => {
                info!(product_id = %id, "Product created");
                Ok(id)
            }
            Err(e) => {
                error!(error = %e, "Failed to add product");
                Err(e.into())
            }
        }
    }

    /// Replaces the fields present in `patch`. Fails if `id` does not exist.
    #[instrument(fields(product_id = %id), skip(self, patch))]
    pub async fn update(&self, id: &str, patch: ProductPatch) -> Result<(), PersistenceError> {
        debug!("Sending update request");
        let fields = to_fields(&patch)?;

        self.store
            .update(self.collection.clone(), id.to_string(), fields)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update product");
                PersistenceError::from(e)
            })
    }

    /// Removes a product. Deleting an id that does not exist succeeds.
    #[instrument(fields(product_id = %id), skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        debug!("Sending delete request");
        self.store
            .delete(self.collection.clone(), id.to_string())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete product");
                PersistenceError::from(e)
            })
    }

    #[instrument(fields(product_id = %id), skip(self))]
    pub async fn set_purchased(&self, id: &str, purchased: bool) -> Result<(), PersistenceError> {
        self.update(id, ProductPatch::purchased(purchased)).await
    }

    /// Opens a live channel on the whole collection, newest product first.
    ///
    /// The current list is available from the returned handle right away;
    /// every later change yields another complete list.
    #[instrument(fields(collection = %self.collection), skip(self))]
    pub async fn subscribe(&self) -> Result<ProductSubscription, SubscriptionError> {
        debug!("Opening product subscription");
        let (sender, receiver) = snapshot_channel();
        let query =
            Query::collection(self.collection.clone()).order_by(FIELD_ADDED_AT, Direction::Descending);

        let watch_id = self.store.watch(query, sender).await.map_err(|e| {
            error!(error = %e, "Failed to open product subscription");
            SubscriptionError::from(e)
        })?;

        info!(watch_id = %watch_id, "Product subscription opened");
        Ok(ProductSubscription::new(watch_id, self.store.clone(), receiver))
    }

    /// Callback form of [`subscribe`](Self::subscribe).
    ///
    /// `on_snapshot` receives every list; `on_error` is called at most once,
    /// when the channel fails, after which `on_snapshot` is not called again.
    /// Dropping the returned handle cancels the subscription.
    pub async fn subscribe_with<F, E>(
        &self,
        on_snapshot: F,
        on_error: E,
    ) -> Result<SubscriptionHandle, SubscriptionError>
    where
        F: FnMut(Vec<Product>) + Send + 'static,
        E: FnOnce(SubscriptionError) + Send + 'static,
    {
        let subscription = self.subscribe().await?;
        Ok(SubscriptionHandle::spawn(subscription, on_snapshot, on_error))
    }
}

fn to_fields<T: Serialize>(value: &T) -> Result<Fields, PersistenceError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(PersistenceError::Encoding(format!(
            "expected an object, got {other}"
        ))),
    }
}
