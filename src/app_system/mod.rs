//! System orchestration, configuration, startup and shutdown.

pub mod config;
pub mod shopping_system;
pub mod tracing;

pub use self::config::*;
pub use self::shopping_system::*;
pub use self::tracing::*;
