//! In-process document database standing in for the hosted backend.
//!
//! The store runs as an actor: [`DocumentStore::run`] owns all state and
//! serves [`StoreRequest`]s sent through a cloneable [`StoreClient`].

mod actor;
mod client;
pub mod error;
pub mod messages;

pub use actor::DocumentStore;
pub use client::StoreClient;
pub use error::StoreError;
pub use messages::*;
