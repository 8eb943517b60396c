//! Sampling parameters for a completion request

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Parameters sent with every completion request (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParams {
    /// Gateway model identifier
    pub model: String,
    /// Sampling temperature, `0.0..=2.0`
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl ChatParams {
    pub const DEFAULT_MODEL: &'static str = "accounts/fireworks/models/llama-v3p1-70b-instruct";
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_MAX_TOKENS: u32 = 2048;
    pub const MAX_TEMPERATURE: f32 = 2.0;
    pub const MAX_TOKENS_LIMIT: u32 = 8192;

    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Check the ranges the gateway accepts.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.model.trim().is_empty() {
            return Err(DomainError::InvalidParams(
                "model cannot be empty".to_string(),
            ));
        }
        if !(0.0..=Self::MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(DomainError::InvalidParams(format!(
                "temperature must be within 0..={}, got {}",
                Self::MAX_TEMPERATURE,
                self.temperature
            )));
        }
        if self.max_tokens == 0 || self.max_tokens > Self::MAX_TOKENS_LIMIT {
            return Err(DomainError::InvalidParams(format!(
                "max_tokens must be within 1..={}, got {}",
                Self::MAX_TOKENS_LIMIT,
                self.max_tokens
            )));
        }
        Ok(())
    }
}

impl Default for ChatParams {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MODEL,
            Self::DEFAULT_TEMPERATURE,
            Self::DEFAULT_MAX_TOKENS,
        )
    }
}
