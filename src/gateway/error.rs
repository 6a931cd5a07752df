use thiserror::Error;

use crate::store::StoreError;

/// A product write that the backend did not acknowledge.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PersistenceError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Could not encode product: {0}")]
    Encoding(String),
}

impl From<StoreError> for PersistenceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => PersistenceError::NotFound(id),
            StoreError::PermissionDenied(collection) => PersistenceError::PermissionDenied(collection),
            StoreError::Unavailable(msg) => PersistenceError::Unavailable(msg),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Encoding(err.to_string())
    }
}

/// Failure of the live product channel. Terminal for that subscription.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubscriptionError {
    #[error("Subscription revoked: {0}")]
    Revoked(String),
    #[error("Subscription channel closed by the backend")]
    Closed,
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for SubscriptionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied(collection) => SubscriptionError::Revoked(collection),
            StoreError::NotFound { collection, id } => {
                SubscriptionError::Revoked(format!("{collection}/{id}"))
            }
            StoreError::Unavailable(msg) => SubscriptionError::Unavailable(msg),
        }
    }
}
