use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::messages::{
    Access, Direction, Document, Fields, Query, Response, SnapshotSender, StoreRequest, WatchId,
};
use super::{StoreClient, StoreError};

type IdFn = Box<dyn Fn() -> String + Send + Sync>;
type ClockFn = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct StoredDocument {
    fields: Fields,
    /// Insertion order, breaks ties between equal sort keys.
    seq: u64,
}

#[derive(Default)]
struct Collection {
    documents: HashMap<String, StoredDocument>,
    access: Access,
}

struct Watcher {
    query: Query,
    sender: SnapshotSender,
}

/// In-process document database.
///
/// Owns every collection, assigns document ids, stamps server timestamps and
/// pushes the full result of each live query to its watcher whenever the
/// watched collection changes.
pub struct DocumentStore {
    receiver: mpsc::Receiver<StoreRequest>,
    collections: HashMap<String, Collection>,
    watchers: HashMap<WatchId, Watcher>,
    next_id_fn: IdFn,
    clock: ClockFn,
    next_seq: u64,
    next_watch: u64,
    /// Last stamp handed out, in microseconds since the epoch.
    last_stamp: i64,
}

impl DocumentStore {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> String + Send + Sync + 'static,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            collections: HashMap::new(),
            watchers: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
            clock: Box::new(clock),
            next_seq: 0,
            next_watch: 1,
            last_stamp: i64::MIN,
        };
        (store, StoreClient::new(sender))
    }

    /// Store with random document ids and the system clock.
    pub fn with_defaults(buffer_size: usize) -> (Self, StoreClient) {
        Self::new(
            buffer_size,
            || Uuid::new_v4().simple().to_string(),
            Utc::now,
        )
    }

    #[instrument(name = "document_store", skip(self))]
    pub async fn run(mut self) {
        info!("DocumentStore starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Add {
                    collection,
                    fields,
                    stamp,
                    respond_to,
                } => self.handle_add(collection, fields, stamp, respond_to),
                StoreRequest::Update {
                    collection,
                    id,
                    fields,
                    respond_to,
                } => self.handle_update(collection, id, fields, respond_to),
                StoreRequest::Delete {
                    collection,
                    id,
                    respond_to,
                } => self.handle_delete(collection, id, respond_to),
                StoreRequest::Watch {
                    query,
                    sender,
                    respond_to,
                } => self.handle_watch(query, sender, respond_to),
                StoreRequest::Unwatch {
                    watch_id,
                    respond_to,
                } => self.handle_unwatch(watch_id, respond_to),
                StoreRequest::SetAccess {
                    collection,
                    access,
                    respond_to,
                } => self.handle_set_access(collection, access, respond_to),
                StoreRequest::Shutdown => {
                    info!("DocumentStore shutting down");
                    break;
                }
            }
        }

        info!(open_watchers = self.watchers.len(), "DocumentStore stopped");
    }

    #[instrument(fields(collection = %collection), skip(self, fields, respond_to))]
    fn handle_add(
        &mut self,
        collection: String,
        mut fields: Fields,
        stamp: Option<String>,
        respond_to: Response<String>,
    ) {
        debug!("Processing add request");

        if let Err(e) = self.check_writable(&collection) {
            let _ = respond_to.send(Err(e));
            return;
        }

        if let Some(field) = stamp {
            let now = self.next_timestamp();
            fields.insert(
                field,
                Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
        }

        let id = (self.next_id_fn)();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.collections
            .entry(collection.clone())
            .or_default()
            .documents
            .insert(id.clone(), StoredDocument { fields, seq });

        info!(document_id = %id, "Document created");
        let _ = respond_to.send(Ok(id.clone()));
        self.notify(&collection);
    }

    #[instrument(fields(collection = %collection, document_id = %id), skip(self, fields, respond_to))]
    fn handle_update(
        &mut self,
        collection: String,
        id: String,
        fields: Fields,
        respond_to: Response<()>,
    ) {
        debug!("Processing update request");

        if let Err(e) = self.check_writable(&collection) {
            let _ = respond_to.send(Err(e));
            return;
        }

        let document = self
            .collections
            .get_mut(&collection)
            .and_then(|c| c.documents.get_mut(&id));

        let Some(document) = document else {
            error!("Document not found for update");
            let _ = respond_to.send(Err(StoreError::NotFound { collection, id }));
            return;
        };

        let mut changed = false;
        for (key, value) in fields {
            if document.fields.get(&key) != Some(&value) {
                document.fields.insert(key, value);
                changed = true;
            }
        }

        info!(changed, "Document updated");
        let _ = respond_to.send(Ok(()));
        if changed {
            self.notify(&collection);
        }
    }

    #[instrument(fields(collection = %collection, document_id = %id), skip(self, respond_to))]
    fn handle_delete(&mut self, collection: String, id: String, respond_to: Response<()>) {
        debug!("Processing delete request");

        if let Err(e) = self.check_writable(&collection) {
            let _ = respond_to.send(Err(e));
            return;
        }

        let removed = self
            .collections
            .get_mut(&collection)
            .and_then(|c| c.documents.remove(&id))
            .is_some();

        let _ = respond_to.send(Ok(()));
        if removed {
            info!("Document deleted");
            self.notify(&collection);
        } else {
            debug!("Delete of missing document ignored");
        }
    }

    #[instrument(fields(collection = %query.collection), skip(self, query, sender, respond_to))]
    fn handle_watch(&mut self, query: Query, sender: SnapshotSender, respond_to: Response<WatchId>) {
        debug!("Processing watch request");

        if self.access(&query.collection) == Access::Denied {
            warn!("Watch rejected");
            let _ = respond_to.send(Err(StoreError::PermissionDenied(query.collection)));
            return;
        }

        let before = self.watchers.len();
        self.watchers.retain(|_, w| !w.sender.is_closed());
        let pruned = before - self.watchers.len();
        if pruned > 0 {
            debug!(pruned, "Pruned closed watchers");
        }

        let watch_id = WatchId(self.next_watch);
        self.next_watch += 1;

        // The initial snapshot goes out before the watcher is registered so the
        // caller always sees the current state first.
        let initial = self.run_query(&query);
        if sender.send(Ok(initial)).is_err() {
            debug!("Watcher dropped before registration");
        } else {
            self.watchers.insert(watch_id, Watcher { query, sender });
        }

        info!(watch_id = %watch_id, "Watch registered");
        let _ = respond_to.send(Ok(watch_id));
    }

    #[instrument(fields(watch_id = %watch_id), skip(self, respond_to))]
    fn handle_unwatch(&mut self, watch_id: WatchId, respond_to: Response<()>) {
        match self.watchers.remove(&watch_id) {
            Some(_) => info!("Watch removed"),
            None => debug!("Watch already gone"),
        }
        let _ = respond_to.send(Ok(()));
    }

    #[instrument(fields(collection = %collection, access = ?access), skip(self, respond_to))]
    fn handle_set_access(&mut self, collection: String, access: Access, respond_to: Response<()>) {
        self.collections.entry(collection.clone()).or_default().access = access;

        if access == Access::Denied {
            let revoked: Vec<WatchId> = self
                .watchers
                .iter()
                .filter(|(_, w)| w.query.collection == collection)
                .map(|(id, _)| *id)
                .collect();
            for id in revoked {
                if let Some(watcher) = self.watchers.remove(&id) {
                    let _ = watcher
                        .sender
                        .send(Err(StoreError::PermissionDenied(collection.clone())));
                    warn!(watch_id = %id, "Watch revoked");
                }
            }
        }

        info!("Access updated");
        let _ = respond_to.send(Ok(()));
    }

    fn access(&self, collection: &str) -> Access {
        self.collections
            .get(collection)
            .map(|c| c.access)
            .unwrap_or_default()
    }

    fn check_writable(&self, collection: &str) -> Result<(), StoreError> {
        match self.access(collection) {
            Access::ReadWrite => Ok(()),
            Access::ReadOnly | Access::Denied => {
                warn!(collection, "Write rejected");
                Err(StoreError::PermissionDenied(collection.to_string()))
            }
        }
    }

    /// Server clock reading, strictly increasing at microsecond resolution.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = (self.clock)();
        let mut micros = now.timestamp_micros();
        if micros <= self.last_stamp {
            micros = self.last_stamp + 1;
        }
        self.last_stamp = micros;
        DateTime::from_timestamp_micros(micros).unwrap_or(now)
    }

    fn run_query(&self, query: &Query) -> Vec<Document> {
        let Some(collection) = self.collections.get(&query.collection) else {
            return Vec::new();
        };

        let mut matches: Vec<(&String, &StoredDocument)> = match &query.order_by {
            Some((field, _)) => collection
                .documents
                .iter()
                .filter(|(_, doc)| doc.fields.contains_key(field))
                .collect(),
            None => collection.documents.iter().collect(),
        };

        matches.sort_by(|(_, a), (_, b)| match &query.order_by {
            Some((field, direction)) => {
                let ordering = compare_values(&a.fields[field], &b.fields[field])
                    .then(a.seq.cmp(&b.seq));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            }
            None => a.seq.cmp(&b.seq),
        });

        matches
            .into_iter()
            .map(|(id, doc)| Document {
                id: id.clone(),
                fields: doc.fields.clone(),
            })
            .collect()
    }

    /// Replaces the latest result of every watcher of `collection`, dropping
    /// the ones whose receiver has gone away.
    fn notify(&mut self, collection: &str) {
        let mut closed = Vec::new();
        for (id, watcher) in &self.watchers {
            if watcher.query.collection != collection {
                continue;
            }
            let snapshot = self.run_query(&watcher.query);
            if watcher.sender.send(Ok(snapshot)).is_err() {
                closed.push(*id);
            }
        }
        for id in closed {
            self.watchers.remove(&id);
            debug!(watch_id = %id, "Pruned closed watcher");
        }
    }
}

/// Orders two field values: numbers numerically, timestamps chronologically,
/// other strings lexically. Values of different kinds compare equal.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(a), Value::String(b)) => {
            match (
                DateTime::parse_from_rfc3339(a),
                DateTime::parse_from_rfc3339(b),
            ) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
