use thiserror::Error;

/// Errors reported by the document store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("Permission denied on collection: {0}")]
    PermissionDenied(String),
    #[error("Store communication error: {0}")]
    Unavailable(String),
}
