//! Infrastructure layer for streamchat
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the HTTP chat gateway, key/value storage,
//! and configuration file loading.

pub mod config;
pub mod gateway;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileChatConfig, FileConfig, FileGatewayConfig,
    FileHistoryConfig,
};
pub use gateway::{
    client::{DEFAULT_BASE_URL, GatewayConfig, StreamingChatClient},
    decoder::{FrameDecoder, Utf8Carry},
    error::DecodeError,
    protocol::ChatCompletionRequest,
};
pub use storage::{InMemoryStorage, JsonFileStorage};
