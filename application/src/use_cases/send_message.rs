//! Send Message use case.
//!
//! Validates the outbound conversation, persists the newest user message,
//! opens a stream through the [`ChatGateway`] and relays its deltas
//! unchanged.
//!
//! # Persistence policy
//!
//! The user message is written to history here, before the stream opens.
//! The assistant reply is written by the caller once its full text is known
//! (see [`ChatController`](super::chat_controller::ChatController)). History
//! appends are idempotent by message id, so a message is never stored twice.

use super::manage_history::HistoryRepository;
use crate::ports::chat_gateway::{ChatGateway, DeltaStream, GatewayError};
use futures::StreamExt;
use std::sync::Arc;
use streamchat_domain::{ChatMessage, ChatParams, DomainError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that can occur when sending a message.
#[derive(Error, Debug)]
pub enum SendMessageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<DomainError> for SendMessageError {
    fn from(error: DomainError) -> Self {
        SendMessageError::Configuration(error.to_string())
    }
}

impl SendMessageError {
    pub fn code(&self) -> &'static str {
        match self {
            SendMessageError::Configuration(_) => "CONFIGURATION_ERROR",
            SendMessageError::Gateway(e) => e.code(),
        }
    }
}

/// Use case that drives one completion request.
#[derive(Clone)]
pub struct SendMessageUseCase {
    gateway: Arc<dyn ChatGateway>,
    history: Option<HistoryRepository>,
}

impl SendMessageUseCase {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self {
            gateway,
            history: None,
        }
    }

    /// Persist outbound user messages to `history`.
    pub fn with_history(mut self, history: HistoryRepository) -> Self {
        self.history = Some(history);
        self
    }

    /// Start streaming a reply to `messages`.
    ///
    /// Fails fast, without any network traffic, when `messages` is empty.
    /// Errors raised while streaming are logged and passed through the
    /// returned stream; cancellation ends it silently.
    pub async fn send(
        &self,
        messages: Vec<ChatMessage>,
        params: ChatParams,
    ) -> Result<DeltaStream, SendMessageError> {
        info!(
            message_count = messages.len(),
            model = %params.model,
            "Starting message send"
        );

        if messages.is_empty() {
            return Err(DomainError::EmptyConversation.into());
        }

        self.persist_outbound(&messages).await;

        let stream = self.gateway.open_stream(&messages, &params);
        Ok(stream.map_inner(|inner| {
            inner.inspect(|item| {
                if let Err(e) = item {
                    error!(error = %e, code = e.code(), "Failed to send message");
                }
            })
        }))
    }

    /// Cancel the stream in flight, if any.
    pub fn stop(&self) {
        self.gateway.stop_stream();
    }

    async fn persist_outbound(&self, messages: &[ChatMessage]) {
        let Some(history) = &self.history else {
            return;
        };
        let Some(latest) = messages.last().filter(|m| m.is_user()) else {
            return;
        };

        match history.append(latest).await {
            Ok(true) => debug!(id = %latest.id, "Saved user message to history"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Failed to save user message to history"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::storage::StoragePort;
    use crate::use_cases::test_support::{MockGateway, MockStorage};
    use streamchat_domain::StreamDelta;

    fn history(storage: &Arc<MockStorage>) -> HistoryRepository {
        HistoryRepository::new(storage.clone() as Arc<dyn StoragePort>)
    }

    #[tokio::test]
    async fn empty_messages_fail_without_opening_stream() {
        let gateway = Arc::new(MockGateway::replying(&["never"]));
        let use_case = SendMessageUseCase::new(gateway.clone());

        let err = use_case
            .send(Vec::new(), ChatParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SendMessageError::Configuration(_)));
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
        assert_eq!(err.to_string(), "Configuration error: No messages provided");
        assert!(gateway.opened().is_empty());
    }

    #[tokio::test]
    async fn relays_deltas_unchanged() {
        let gateway = Arc::new(MockGateway::replying(&["Hel", "lo"]));
        let use_case = SendMessageUseCase::new(gateway.clone());

        let deltas: Vec<StreamDelta> = use_case
            .send(vec![ChatMessage::user("Hi")], ChatParams::default())
            .await
            .unwrap()
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(
            deltas,
            vec![
                StreamDelta::text("Hel"),
                StreamDelta::text("lo"),
                StreamDelta::finished()
            ]
        );
        assert_eq!(gateway.opened().len(), 1);
    }

    #[tokio::test]
    async fn stream_errors_are_reraised() {
        let gateway = Arc::new(MockGateway::failing(GatewayError::Network {
            status: 500,
            body: "internal".to_string(),
        }));
        let use_case = SendMessageUseCase::new(gateway);

        let mut stream = use_case
            .send(vec![ChatMessage::user("Hi")], ChatParams::default())
            .await
            .unwrap();
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, GatewayError::Network { status: 500, .. }));
    }

    #[tokio::test]
    async fn persists_latest_user_message_once() {
        let storage = Arc::new(MockStorage::new());
        let gateway = Arc::new(
            MockGateway::replying(&["a"]).with_script(vec![Ok(StreamDelta::finished())]),
        );
        let use_case = SendMessageUseCase::new(gateway).with_history(history(&storage));
        let message = ChatMessage::user("Hi");

        for _ in 0..2 {
            let _ = use_case
                .send(vec![message.clone()], ChatParams::default())
                .await
                .unwrap()
                .collect_text()
                .await;
        }

        let stored = history(&storage).load().await.unwrap();
        assert_eq!(stored, vec![message]);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_abort_send() {
        let storage = Arc::new(MockStorage::new());
        storage.fail_writes(true);
        let gateway = Arc::new(MockGateway::replying(&["still here"]));
        let use_case = SendMessageUseCase::new(gateway).with_history(history(&storage));

        let text = use_case
            .send(vec![ChatMessage::user("Hi")], ChatParams::default())
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        assert_eq!(text, "still here");
    }

    #[tokio::test]
    async fn stop_delegates_to_gateway() {
        let gateway = Arc::new(MockGateway::new());
        let use_case = SendMessageUseCase::new(gateway.clone());
        use_case.stop();
        use_case.stop();
        assert_eq!(gateway.stop_count(), 2);
    }
}
