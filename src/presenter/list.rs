use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::form::{FormMode, ProductForm};
use super::notice::{Notice, Operation};
use crate::aggregator::ListSummary;
use crate::domain::Product;
use crate::gateway::{ProductGateway, SubscriptionError, SubscriptionHandle};

/// What the list screen renders. Replaced as a whole on every snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    pub products: Vec<Product>,
    pub summary: ListSummary,
    /// True until the first snapshot arrives.
    pub loading: bool,
    /// Set when the live channel fails; the last list stays on screen.
    pub sync_error: Option<SubscriptionError>,
}

impl ListState {
    fn loading() -> Self {
        Self {
            products: Vec::new(),
            summary: ListSummary::default(),
            loading: true,
            sync_error: None,
        }
    }

    fn from_snapshot(products: Vec<Product>) -> Self {
        Self {
            summary: ListSummary::from_products(&products),
            products,
            loading: false,
            sync_error: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(String),
    Updated(String),
    /// Validation failed; messages are on the form and nothing was sent.
    Invalid,
}

/// A delete the user has been asked to confirm. Passing it to
/// [`ListPresenter::delete`] is the confirmation; dropping it cancels.
#[derive(Debug)]
pub struct PendingDelete {
    id: String,
}

impl PendingDelete {
    pub const TITLE: &'static str = "Confirm deletion";
    pub const MESSAGE: &'static str = "Do you really want to delete this product?";

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Drives the shopping list screen.
///
/// Holds the single live subscription of the screen and publishes every
/// snapshot, with its summary, through a `watch` channel. User actions go to
/// the gateway; their results show up with the next snapshot.
pub struct ListPresenter {
    gateway: ProductGateway,
    state: watch::Receiver<ListState>,
    subscription: SubscriptionHandle,
    form: ProductForm,
}

impl ListPresenter {
    #[instrument(name = "list_presenter", fields(collection = %gateway.collection()), skip(gateway))]
    pub async fn mount(gateway: ProductGateway) -> Result<Self, SubscriptionError> {
        let (state_tx, state) = watch::channel(ListState::loading());
        let state_tx = Arc::new(state_tx);
        let error_tx = Arc::clone(&state_tx);

        let subscription = gateway
            .subscribe_with(
                move |products| {
                    state_tx.send_replace(ListState::from_snapshot(products));
                },
                move |err| {
                    warn!(error = %err, "List stopped updating");
                    error_tx.send_modify(|state| state.sync_error = Some(err));
                },
            )
            .await?;

        info!("List mounted");
        Ok(Self {
            gateway,
            state,
            subscription,
            form: ProductForm::default(),
        })
    }

    /// Current screen state.
    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state replacement.
    pub fn watch(&self) -> watch::Receiver<ListState> {
        self.state.clone()
    }

    pub fn form(&self) -> &ProductForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProductForm {
        &mut self.form
    }

    pub fn open_add(&mut self) {
        self.form.open_add();
    }

    /// Opens the form on a product of the current list. Returns false if the
    /// product is not in the list.
    pub fn open_edit(&mut self, id: &str) -> bool {
        let product = self.state.borrow().find(id).cloned();
        match product {
            Some(product) => {
                self.form.open_edit(&product);
                true
            }
            None => {
                debug!(product_id = %id, "Nothing to edit");
                false
            }
        }
    }

    pub fn cancel_form(&mut self) {
        self.form.reset();
    }

    /// Validates the form and, if it is valid, creates or updates the
    /// product. The form is cleared once the backend accepts the write.
    #[instrument(skip(self))]
    pub async fn save(&mut self) -> Result<SaveOutcome, Notice> {
        let Some(draft) = self.form.submit() else {
            debug!(invalid_fields = self.form.errors().len(), "Form rejected");
            return Ok(SaveOutcome::Invalid);
        };

        let result = match self.form.mode().clone() {
            FormMode::Add => self
                .gateway
                .create(draft)
                .await
                .map(SaveOutcome::Created)
                .map_err(|e| (Operation::Add, e)),
            FormMode::Edit { id } => self
                .gateway
                .update(&id, draft.into())
                .await
                .map(|()| SaveOutcome::Updated(id))
                .map_err(|e| (Operation::Edit, e)),
        };

        match result {
            Ok(outcome) => {
                self.form.reset();
                Ok(outcome)
            }
            Err((operation, e)) => {
                warn!(%operation, error = %e, "Save failed");
                Err(Notice::failed(operation))
            }
        }
    }

    /// Flips the purchased flag of a product in the current list.
    #[instrument(fields(product_id = %id), skip(self))]
    pub async fn toggle_purchased(&self, id: &str) -> Result<(), Notice> {
        let current = self.state.borrow().find(id).map(|p| p.purchased);
        let Some(purchased) = current else {
            warn!("Product not in list");
            return Err(Notice::failed(Operation::Update));
        };

        self.gateway
            .set_purchased(id, !purchased)
            .await
            .map_err(|e| {
                warn!(error = %e, "Toggle failed");
                Notice::failed(Operation::Update)
            })
    }

    /// First step of a delete: the caller shows the prompt, then passes the
    /// returned value to [`delete`](Self::delete) if the user confirms.
    pub fn request_delete(&self, id: impl Into<String>) -> PendingDelete {
        PendingDelete { id: id.into() }
    }

    #[instrument(fields(product_id = %pending.id), skip(self, pending))]
    pub async fn delete(&self, pending: PendingDelete) -> Result<(), Notice> {
        self.gateway.delete(&pending.id).await.map_err(|e| {
            warn!(error = %e, "Delete failed");
            Notice::failed(Operation::Delete)
        })
    }

    /// Cancels the live subscription. Calling it again does nothing.
    pub fn unmount(&mut self) {
        if self.subscription.is_active() {
            info!("List unmounted");
        }
        self.subscription.unsubscribe();
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_active()
    }
}
