use std::fmt;

use serde_json::{Map, Value};
use tokio::sync::{oneshot, watch};

use super::StoreError;

/// Body of a stored document: field name to JSON value.
pub type Fields = Map<String, Value>;

pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// Latest full query result of a watcher. An `Err` is terminal.
pub type Snapshot = Result<Vec<Document>, StoreError>;

/// Channel a watcher receives query results on. It holds only the latest
/// result, so a reader that falls behind skips straight to the current one.
pub type SnapshotSender = watch::Sender<Snapshot>;
pub type SnapshotReceiver = watch::Receiver<Snapshot>;

/// Opens a snapshot channel. The placeholder value counts as already seen,
/// so the first change a reader observes is the store's initial result.
pub fn snapshot_channel() -> (SnapshotSender, SnapshotReceiver) {
    watch::channel(Ok(Vec::new()))
}

/// A document as returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// All documents of one collection, optionally ordered by a field.
///
/// As with hosted document stores, documents lacking the `order_by` field
/// are left out of an ordered query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            order_by: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }
}

/// Access rule applied to a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Access {
    #[default]
    ReadWrite,
    /// Reads and live queries work, writes are rejected.
    ReadOnly,
    /// Everything is rejected and live queries are terminated.
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch_{}", self.0)
    }
}

/// Requests handled by the [`DocumentStore`](super::DocumentStore) actor.
#[derive(Debug)]
pub enum StoreRequest {
    /// Creates a document under a fresh id. `stamp` names a field to set to
    /// the server clock.
    Add {
        collection: String,
        fields: Fields,
        stamp: Option<String>,
        respond_to: Response<String>,
    },
    /// Overwrites the given fields of an existing document.
    Update {
        collection: String,
        id: String,
        fields: Fields,
        respond_to: Response<()>,
    },
    /// Removes a document. Missing documents are not an error.
    Delete {
        collection: String,
        id: String,
        respond_to: Response<()>,
    },
    Watch {
        query: Query,
        sender: SnapshotSender,
        respond_to: Response<WatchId>,
    },
    Unwatch {
        watch_id: WatchId,
        respond_to: Response<()>,
    },
    SetAccess {
        collection: String,
        access: Access,
        respond_to: Response<()>,
    },
    Shutdown,
}
