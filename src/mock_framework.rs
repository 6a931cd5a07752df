//! # Mock Framework
//!
//! Utilities for testing store clients in isolation.
//!
//! Use [`create_mock_store`] to get a client and the receiving end of its
//! channel, then helpers like [`expect_add`] or [`expect_watch`] to assert on
//! each request and script the reply.

use tokio::sync::mpsc;

use crate::store::{Fields, Query, Response, SnapshotSender, StoreClient, StoreRequest, WatchId};

/// Creates a store client whose requests land on the returned receiver instead
/// of a running `DocumentStore`.
pub fn create_mock_store(buffer_size: usize) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StoreClient::new(sender), receiver)
}

/// Helper to verify that the next message is an Add request
pub async fn expect_add(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, Fields, Option<String>, Response<String>)> {
    match receiver.recv().await {
        Some(StoreRequest::Add {
            collection,
            fields,
            stamp,
            respond_to,
        }) => Some((collection, fields, stamp, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Update request
pub async fn expect_update(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, String, Fields, Response<()>)> {
    match receiver.recv().await {
        Some(StoreRequest::Update {
            collection,
            id,
            fields,
            respond_to,
        }) => Some((collection, id, fields, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Delete request
pub async fn expect_delete(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, String, Response<()>)> {
    match receiver.recv().await {
        Some(StoreRequest::Delete {
            collection,
            id,
            respond_to,
        }) => Some((collection, id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Watch request
pub async fn expect_watch(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Query, SnapshotSender, Response<WatchId>)> {
    match receiver.recv().await {
        Some(StoreRequest::Watch {
            query,
            sender,
            respond_to,
        }) => Some((query, sender, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Unwatch request
pub async fn expect_unwatch(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(WatchId, Response<()>)> {
    match receiver.recv().await {
        Some(StoreRequest::Unwatch {
            watch_id,
            respond_to,
        }) => Some((watch_id, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_store() {
        let (client, mut receiver) = create_mock_store(10);

        let add_task = tokio::spawn(async move {
            let mut fields = Fields::new();
            fields.insert("nomeProduto".into(), json!("Test"));
            client.add("produtos".into(), fields, None).await
        });

        let (collection, fields, stamp, responder) =
            expect_add(&mut receiver).await.expect("Expected Add request");
        assert_eq!(collection, "produtos");
        assert_eq!(fields["nomeProduto"], json!("Test"));
        assert!(stamp.is_none());
        responder.send(Ok("doc_1".to_string())).unwrap();

        let result = add_task.await.unwrap();
        assert_eq!(result, Ok("doc_1".to_string()));
    }
}
