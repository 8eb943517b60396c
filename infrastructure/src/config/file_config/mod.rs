//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain types on use.

mod chat;
mod gateway;
mod history;

pub use chat::FileChatConfig;
pub use gateway::{DEFAULT_API_KEY_ENV, FileGatewayConfig};
pub use history::FileHistoryConfig;

use serde::{Deserialize, Serialize};
use streamchat_domain::ChatParams;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("chat.model cannot be empty")]
    EmptyModelName,

    #[error("chat.temperature must be within 0..={max}, got {value}")]
    TemperatureOutOfRange { value: f32, max: f32 },

    #[error("chat.max_tokens must be within 1..={max}, got {value}")]
    MaxTokensOutOfRange { value: u32, max: u32 },

    #[error("history.limit cannot be 0")]
    ZeroHistoryLimit,

    #[error("gateway.base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("no API key: set gateway.api_key or the {env} environment variable")]
    MissingApiKey { env: String },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Chat API endpoint and credentials
    pub gateway: FileGatewayConfig,
    /// Default request parameters
    pub chat: FileChatConfig,
    /// Persisted history
    pub history: FileHistoryConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// A missing API key is not reported here; commands that never reach
    /// the gateway work without one. See [`FileGatewayConfig::resolve_api_key`].
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.gateway.base_url.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyBaseUrl);
        }
        if self.chat.model.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyModelName);
        }
        if !(0.0..=ChatParams::MAX_TEMPERATURE).contains(&self.chat.temperature) {
            issues.push(ConfigValidationError::TemperatureOutOfRange {
                value: self.chat.temperature,
                max: ChatParams::MAX_TEMPERATURE,
            });
        }
        if self.chat.max_tokens == 0 || self.chat.max_tokens > ChatParams::MAX_TOKENS_LIMIT {
            issues.push(ConfigValidationError::MaxTokensOutOfRange {
                value: self.chat.max_tokens,
                max: ChatParams::MAX_TOKENS_LIMIT,
            });
        }
        if self.history.limit == 0 {
            issues.push(ConfigValidationError::ZeroHistoryLimit);
        }

        issues
    }

    /// Request parameters used when neither the request nor stored
    /// settings override them.
    pub fn chat_params(&self) -> ChatParams {
        self.chat.to_params()
    }
}
