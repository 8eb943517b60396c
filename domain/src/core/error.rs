//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("No messages provided")]
    EmptyConversation,

    #[error("Invalid chat parameters: {0}")]
    InvalidParams(String),
}
