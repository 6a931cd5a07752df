//! Product store gateway: mutations against the products collection and the
//! live feed of the whole list.

pub mod error;
mod product_gateway;
mod subscription;

pub use error::{PersistenceError, SubscriptionError};
pub use product_gateway::ProductGateway;
pub use subscription::{ProductSubscription, SubscriptionHandle};
