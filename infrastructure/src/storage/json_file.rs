//! JSON file storage adapter
//!
//! All keys live in one JSON object. Writes go to a sibling temp file that
//! is then renamed over the store, so a crash never leaves a truncated
//! store behind.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use streamchat_application::{StorageError, StoragePort};
use tokio::sync::Mutex;
use tracing::debug;

/// File name used under the data directory.
pub const DEFAULT_STORE_FILE: &str = "store.json";

/// [`StoragePort`] persisted as a single JSON object.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<data dir>/streamchat/store.json`, if the platform has a data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("streamchat").join(DEFAULT_STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self, key: &str) -> Result<Map<String, Value>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(StorageError::Read {
                    key: key.to_string(),
                    source: Box::new(e),
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Read {
                key: key.to_string(),
                source: format!("{} does not contain a JSON object", self.path.display())
                    .into(),
            }),
            Err(source) => Err(StorageError::Serialization {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn write_all(&self, operation: &str, map: Map<String, Value>) -> Result<(), StorageError> {
        let write_error = |source: Box<dyn std::error::Error + Send + Sync>| StorageError::Write {
            operation: operation.to_string(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_error(e.into()))?;
        }

        let contents = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| write_error(e.into()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| write_error(e.into()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| write_error(e.into()))?;

        debug!("Wrote {} ({})", self.path.display(), operation);
        Ok(())
    }
}

#[async_trait]
impl StoragePort for JsonFileStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_all(key).await?;
        Ok(map.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_all(key).await?;
        map.insert(key.to_string(), value);
        self.write_all(&format!("set {}", key), map).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_all(key).await?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&format!("remove {}", key), map).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Write {
                operation: "clear".to_string(),
                source: Box::new(e),
            }),
        }
    }
}
