//! History management use cases.
//!
//! History is a bounded list of [`ChatMessage`]s stored as one JSON array
//! under [`HISTORY_KEY`]. Only the most recent messages are kept.

use crate::ports::storage::{StorageError, StoragePort};
use std::sync::Arc;
use streamchat_domain::ChatMessage;
use tracing::{debug, error, info};

/// Storage key of the persisted conversation.
pub const HISTORY_KEY: &str = "chat-history";

/// Number of messages kept when no limit is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Typed access to the persisted conversation.
#[derive(Clone)]
pub struct HistoryRepository {
    storage: Arc<dyn StoragePort>,
    limit: usize,
}

impl HistoryRepository {
    pub fn new(storage: Arc<dyn StoragePort>) -> Self {
        Self {
            storage,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` messages (at least one).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn load(&self) -> Result<Vec<ChatMessage>, StorageError> {
        match self.storage.get(HISTORY_KEY).await? {
            Some(value) => {
                serde_json::from_value(value).map_err(|source| StorageError::Serialization {
                    key: HISTORY_KEY.to_string(),
                    source,
                })
            }
            None => Ok(Vec::new()),
        }
    }

    /// Append `message` unless a message with the same id is already
    /// stored, trimming to the newest `limit` entries. Returns whether the
    /// message was written.
    pub async fn append(&self, message: &ChatMessage) -> Result<bool, StorageError> {
        let mut history = self.load().await?;
        if history.iter().any(|existing| existing.id == message.id) {
            debug!(id = %message.id, "Message already in history");
            return Ok(false);
        }

        history.push(message.clone());
        if history.len() > self.limit {
            let excess = history.len() - self.limit;
            history.drain(..excess);
        }

        let value = serde_json::to_value(&history).map_err(|source| {
            StorageError::Serialization {
                key: HISTORY_KEY.to_string(),
                source,
            }
        })?;
        self.storage.set(HISTORY_KEY, value).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(HISTORY_KEY).await
    }
}

/// Load the persisted conversation. Failures yield an empty history.
pub struct LoadHistoryUseCase {
    history: HistoryRepository,
}

impl LoadHistoryUseCase {
    pub fn new(history: HistoryRepository) -> Self {
        Self { history }
    }

    pub async fn execute(&self) -> Vec<ChatMessage> {
        match self.history.load().await {
            Ok(messages) => {
                debug!(count = messages.len(), "Loaded chat history");
                messages
            }
            Err(e) => {
                error!(error = %e, "Failed to load history");
                Vec::new()
            }
        }
    }
}

/// Delete the persisted conversation. Failures are logged and returned.
pub struct ClearHistoryUseCase {
    history: HistoryRepository,
}

impl ClearHistoryUseCase {
    pub fn new(history: HistoryRepository) -> Self {
        Self { history }
    }

    pub async fn execute(&self) -> Result<(), StorageError> {
        match self.history.clear().await {
            Ok(()) => {
                info!("Cleared chat history");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to clear history");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::MockStorage;
    use streamchat_domain::Role;

    fn repository(storage: &Arc<MockStorage>) -> HistoryRepository {
        HistoryRepository::new(storage.clone() as Arc<dyn StoragePort>)
    }

    #[tokio::test]
    async fn load_returns_empty_when_absent() {
        let storage = Arc::new(MockStorage::new());
        assert!(repository(&storage).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let storage = Arc::new(MockStorage::new());
        let history = repository(&storage);
        let message = ChatMessage::user("Hello");

        assert!(history.append(&message).await.unwrap());
        let loaded = history.load().await.unwrap();
        assert_eq!(loaded, vec![message]);
    }

    #[tokio::test]
    async fn append_is_idempotent_by_id() {
        let storage = Arc::new(MockStorage::new());
        let history = repository(&storage);
        let message = ChatMessage::user("Hello");

        assert!(history.append(&message).await.unwrap());
        assert!(!history.append(&message).await.unwrap());
        assert_eq!(history.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn append_keeps_newest_messages() {
        let storage = Arc::new(MockStorage::new());
        let history = repository(&storage).with_limit(2);
        for content in ["one", "two", "three"] {
            history.append(&ChatMessage::user(content)).await.unwrap();
        }

        let contents: Vec<String> = history
            .load()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn load_rejects_malformed_history() {
        let storage = Arc::new(MockStorage::new());
        storage
            .set(HISTORY_KEY, serde_json::json!({"not": "a list"}))
            .await
            .unwrap();
        let err = repository(&storage).load().await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization { .. }));
    }

    #[tokio::test]
    async fn load_use_case_swallows_failures() {
        let storage = Arc::new(MockStorage::new());
        repository(&storage)
            .append(&ChatMessage::assistant("kept"))
            .await
            .unwrap();
        storage.fail_reads(true);

        let use_case = LoadHistoryUseCase::new(repository(&storage));
        assert!(use_case.execute().await.is_empty());

        storage.fail_reads(false);
        let loaded = use_case.execute().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn clear_use_case_removes_history() {
        let storage = Arc::new(MockStorage::new());
        let history = repository(&storage);
        history.append(&ChatMessage::user("bye")).await.unwrap();

        ClearHistoryUseCase::new(history.clone())
            .execute()
            .await
            .unwrap();
        assert!(history.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_use_case_propagates_failures() {
        let storage = Arc::new(MockStorage::new());
        storage.fail_writes(true);
        let result = ClearHistoryUseCase::new(repository(&storage)).execute().await;
        assert!(matches!(result, Err(StorageError::Write { .. })));
    }
}
