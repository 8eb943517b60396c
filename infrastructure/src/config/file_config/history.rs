//! History configuration from TOML (`[history]` section)

use crate::storage::JsonFileStorage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use streamchat_application::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHistoryConfig {
    /// Store file (default: `<data dir>/streamchat/store.json`)
    pub path: Option<PathBuf>,
    /// Number of messages kept
    pub limit: usize,
}

impl Default for FileHistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl FileHistoryConfig {
    /// Configured path, or the platform default.
    pub fn store_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(JsonFileStorage::default_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = FileHistoryConfig {
            path: Some(PathBuf::from("/tmp/chat.json")),
            ..Default::default()
        };
        assert_eq!(config.store_path(), Some(PathBuf::from("/tmp/chat.json")));
    }
}
