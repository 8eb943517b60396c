//! Request defaults from TOML (`[chat]` section)

use serde::{Deserialize, Serialize};
use streamchat_domain::ChatParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChatConfig {
    /// Gateway model identifier
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for FileChatConfig {
    fn default() -> Self {
        let params = ChatParams::default();
        Self {
            model: params.model,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }
}

impl FileChatConfig {
    pub fn to_params(&self) -> ChatParams {
        ChatParams::new(self.model.clone(), self.temperature, self.max_tokens)
    }
}
