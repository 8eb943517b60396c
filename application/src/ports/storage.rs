//! Key/value storage port
//!
//! Persistence for chat history and stored settings. Values are JSON so
//! adapters stay independent of the types stored in them.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by storage adapters
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to get value for key: {key}")]
    Read {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to write storage ({operation})")]
    Write {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Stored value for key {key} has an unexpected shape: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Async key/value store
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Value stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key.
    async fn clear(&self) -> Result<(), StorageError>;
}
