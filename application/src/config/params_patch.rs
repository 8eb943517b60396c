//! Partial parameter overrides.
//!
//! Effective request parameters are resolved in layers: an explicit
//! per-request value wins over stored settings, which win over the file
//! configuration. Each layer above the base is a [`ParamsPatch`].

use serde::{Deserialize, Serialize};
use streamchat_domain::ChatParams;

/// A partial set of [`ChatParams`]. `None` fields leave the base untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ParamsPatch {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.temperature.is_none() && self.max_tokens.is_none()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Overlay this patch on `base`. A blank model or a zero token budget
    /// counts as unset.
    pub fn apply_to(&self, base: ChatParams) -> ChatParams {
        ChatParams {
            model: self
                .model
                .as_ref()
                .filter(|m| !m.trim().is_empty())
                .cloned()
                .unwrap_or(base.model),
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self
                .max_tokens
                .filter(|&n| n > 0)
                .unwrap_or(base.max_tokens),
        }
    }

    /// Combine with a newer patch; fields set in `newer` win.
    pub fn merge(self, newer: ParamsPatch) -> ParamsPatch {
        ParamsPatch {
            model: newer.model.or(self.model),
            temperature: newer.temperature.or(self.temperature),
            max_tokens: newer.max_tokens.or(self.max_tokens),
        }
    }
}
