//! Stored chat settings.
//!
//! Users can persist parameter overrides (model, temperature, token budget)
//! through the storage port. They are kept as a [`ParamsPatch`] under
//! [`SETTINGS_KEY`] and layered over the file configuration's defaults.

use crate::config::ParamsPatch;
use crate::ports::storage::{StorageError, StoragePort};
use std::sync::Arc;
use streamchat_domain::{ChatParams, DomainError};
use thiserror::Error;
use tracing::info;

/// Storage key of the persisted settings.
pub const SETTINGS_KEY: &str = "ai-chat-config";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Read, update and clear stored settings.
#[derive(Clone)]
pub struct SettingsStore {
    storage: Arc<dyn StoragePort>,
    defaults: ChatParams,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn StoragePort>, defaults: ChatParams) -> Self {
        Self { storage, defaults }
    }

    /// The stored overrides alone (empty when nothing is stored).
    pub async fn stored(&self) -> Result<ParamsPatch, SettingsError> {
        match self.storage.get(SETTINGS_KEY).await? {
            Some(value) => serde_json::from_value(value).map_err(|source| {
                SettingsError::Storage(StorageError::Serialization {
                    key: SETTINGS_KEY.to_string(),
                    source,
                })
            }),
            None => Ok(ParamsPatch::default()),
        }
    }

    /// Effective parameters: stored overrides over the defaults, validated.
    pub async fn get(&self) -> Result<ChatParams, SettingsError> {
        let params = self.stored().await?.apply_to(self.defaults.clone());
        params.validate()?;
        Ok(params)
    }

    /// Merge `patch` into the stored overrides. Nothing is written when the
    /// result would be invalid.
    pub async fn update(&self, patch: ParamsPatch) -> Result<ChatParams, SettingsError> {
        let merged = self.stored().await?.merge(patch);
        let params = merged.apply_to(self.defaults.clone());
        params.validate()?;

        let value = serde_json::to_value(&merged).map_err(|source| {
            SettingsError::Storage(StorageError::Serialization {
                key: SETTINGS_KEY.to_string(),
                source,
            })
        })?;
        self.storage.set(SETTINGS_KEY, value).await?;
        info!(model = %params.model, "Updated chat settings");
        Ok(params)
    }

    pub async fn clear(&self) -> Result<(), SettingsError> {
        self.storage.remove(SETTINGS_KEY).await?;
        info!("Cleared chat settings");
        Ok(())
    }
}
