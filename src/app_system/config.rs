use std::env;

use thiserror::Error;

use crate::domain::PRODUCTS_COLLECTION;

pub const ENV_COLLECTION: &str = "SMARTMARKET_COLLECTION";
pub const ENV_BUFFER_SIZE: &str = "SMARTMARKET_BUFFER_SIZE";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Backend settings, passed explicitly to [`ShoppingSystem`](super::ShoppingSystem).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Collection holding the products.
    pub collection: String,
    /// Capacity of the store's request channel.
    pub buffer_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            collection: PRODUCTS_COLLECTION.to_string(),
            buffer_size: 32,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `SMARTMARKET_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(collection) = lookup(ENV_COLLECTION) {
            let collection = collection.trim();
            if collection.is_empty() || collection.contains('/') {
                return Err(ConfigError::InvalidValue {
                    key: ENV_COLLECTION,
                    value: collection.to_string(),
                });
            }
            config.collection = collection.to_string();
        }

        if let Some(raw) = lookup(ENV_BUFFER_SIZE) {
            config.buffer_size = match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_BUFFER_SIZE,
                        value: raw,
                    })
                }
            };
        }

        Ok(config)
    }
}
