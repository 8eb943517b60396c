//! Gateway configuration from TOML (`[gateway]` section)

use super::ConfigValidationError;
use crate::gateway::client::{DEFAULT_BASE_URL, GatewayConfig};
use serde::{Deserialize, Serialize};

/// Environment variable consulted when `gateway.api_key` is unset.
pub const DEFAULT_API_KEY_ENV: &str = "FIREWORKS_API_KEY";

/// Chat API endpoint configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Direct API key (not recommended, use the env var instead).
    pub api_key: Option<String>,
    /// Environment variable name for the API key.
    pub api_key_env: String,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl std::fmt::Debug for FileGatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileGatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .finish()
    }
}

impl FileGatewayConfig {
    /// `api_key` if set and non-blank, else the value of `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| lookup(&self.api_key_env))
            .filter(|key| !key.trim().is_empty())
    }

    /// Connection settings for the HTTP client.
    pub fn to_gateway_config(&self) -> Result<GatewayConfig, ConfigValidationError> {
        let api_key = self
            .resolve_api_key()
            .ok_or_else(|| ConfigValidationError::MissingApiKey {
                env: self.api_key_env.clone(),
            })?;
        Ok(GatewayConfig::new(self.base_url.clone(), api_key))
    }
}
