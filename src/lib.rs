//! Shopping list core.
//!
//! Products live in a document store that pushes the whole ordered list to
//! every subscriber after each change. The [`gateway`] wraps that store with
//! product semantics, [`aggregator`] derives the list totals, [`validation`]
//! turns raw form input into drafts and [`presenter`] ties them together for
//! the list screen.

pub mod aggregator;
pub mod app_system;
pub mod domain;
pub mod gateway;
pub mod presenter;
pub mod store;
pub mod validation;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod mock_framework;

pub use aggregator::ListSummary;
pub use domain::{Product, ProductDraft, ProductPatch};
pub use gateway::{PersistenceError, ProductGateway, ProductSubscription, SubscriptionError};
pub use presenter::ListPresenter;
pub use validation::{validate, ProductInput, ValidationErrors};
