//! Error types for the gateway adapter

use streamchat_application::GatewayError;
use thiserror::Error;

/// A `data:` frame whose payload is not a valid chunk object.
#[derive(Error, Debug)]
#[error("Failed to parse stream chunk: {payload}")]
pub struct DecodeError {
    /// The raw payload after the `data: ` prefix
    pub payload: String,
    #[source]
    pub source: serde_json::Error,
}

impl From<DecodeError> for GatewayError {
    fn from(error: DecodeError) -> Self {
        GatewayError::Decode {
            payload: error.payload,
            source: Box::new(error.source),
        }
    }
}
