//! Chat controller.
//!
//! The caller side of the streaming pipeline: it turns user input into
//! [`SessionEvent`]s, drives [`SendMessageUseCase`], folds every delta into
//! the [`SessionStore`] and persists the finished reply.
//!
//! ```text
//! submit(text) ─▶ MessageAdded ─▶ StreamStarted ─▶ StreamDelta* ─▶ StreamEnded
//!                                                    └─ error ─▶ StreamError
//! ```

use super::manage_history::{ClearHistoryUseCase, HistoryRepository, LoadHistoryUseCase};
use super::send_message::{SendMessageError, SendMessageUseCase};
use super::stop_stream::StopStreamUseCase;
use crate::ports::chat_gateway::ChatGateway;
use crate::ports::storage::StorageError;
use crate::session_store::SessionStore;
use futures::StreamExt;
use std::sync::Arc;
use streamchat_domain::util::preview;
use streamchat_domain::{
    ChatMessage, ChatMetrics, ChatParams, MetricsRecorder, SessionEvent, SessionState,
};
use tracing::{debug, warn};

/// Result of one completed (or stopped) reply.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The assistant message appended to the session
    pub reply: ChatMessage,
    pub metrics: ChatMetrics,
    /// The stream was stopped before the gateway finished it
    pub cancelled: bool,
}

/// Owns one chat session: its store, its gateway and its history.
pub struct ChatController {
    store: SessionStore,
    send_message: SendMessageUseCase,
    stop_stream: StopStreamUseCase,
    history: HistoryRepository,
}

impl ChatController {
    pub fn new(gateway: Arc<dyn ChatGateway>, history: HistoryRepository) -> Self {
        Self {
            store: SessionStore::new(),
            send_message: SendMessageUseCase::new(gateway.clone()).with_history(history.clone()),
            stop_stream: StopStreamUseCase::new(gateway),
            history,
        }
    }

    pub fn state(&self) -> Arc<SessionState> {
        self.store.state()
    }

    /// Store access for subscribing listeners.
    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    /// A handle that can stop the current stream from another task.
    pub fn stop_handle(&self) -> StopStreamUseCase {
        self.stop_stream.clone()
    }

    pub fn stop(&self) {
        self.stop_stream.execute();
    }

    /// Replace the session's messages with persisted history.
    pub async fn load_history(&mut self) -> usize {
        let messages = LoadHistoryUseCase::new(self.history.clone()).execute().await;
        let count = messages.len();
        self.store.dispatch(SessionEvent::HistoryLoaded(messages));
        count
    }

    /// Delete persisted history; the session is cleared only on success.
    pub async fn clear_history(&mut self) -> Result<(), StorageError> {
        ClearHistoryUseCase::new(self.history.clone())
            .execute()
            .await?;
        self.store.dispatch(SessionEvent::HistoryCleared);
        Ok(())
    }

    pub fn clear_error(&mut self) {
        self.store.dispatch(SessionEvent::ErrorCleared);
    }

    /// Send `content` as a user message and stream the reply into the
    /// session.
    ///
    /// A stopped stream still ends the reply normally with whatever text
    /// arrived. Failures are recorded as the session error and returned.
    pub async fn submit(
        &mut self,
        content: &str,
        params: ChatParams,
    ) -> Result<SubmitOutcome, SendMessageError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SendMessageError::Configuration(
                "Message content is empty".to_string(),
            ));
        }

        let user_message = ChatMessage::user(content);
        debug!(
            id = %user_message.id,
            content = %preview(content, 80),
            model = %params.model,
            "Submitting message"
        );
        let mut outbound = self.store.state().messages.clone();
        outbound.push(user_message.clone());

        self.store.dispatch(SessionEvent::MessageAdded(user_message));
        self.store.dispatch(SessionEvent::StreamStarted);

        let mut stream = match self.send_message.send(outbound, params).await {
            Ok(stream) => stream,
            Err(e) => {
                self.store.dispatch(SessionEvent::StreamError(e.to_string()));
                return Err(e);
            }
        };

        let mut recorder = MetricsRecorder::start();
        let mut finished = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => {
                    recorder.record(&delta);
                    if !delta.content.is_empty() {
                        self.store.dispatch(SessionEvent::StreamDelta(delta.content));
                    }
                    if delta.finished {
                        finished = true;
                        break;
                    }
                }
                Err(e) => {
                    self.store.dispatch(SessionEvent::StreamError(e.to_string()));
                    return Err(e.into());
                }
            }
        }

        let metrics = recorder.finish();
        self.store
            .dispatch(SessionEvent::StreamEnded(metrics.clone()));

        let state = self.store.state();
        let Some(reply) = state.messages.last().cloned() else {
            return Err(SendMessageError::Configuration(
                "Session lost the streamed reply".to_string(),
            ));
        };
        self.persist_reply(&reply).await;

        Ok(SubmitOutcome {
            reply,
            metrics,
            cancelled: !finished,
        })
    }

    async fn persist_reply(&self, reply: &ChatMessage) {
        if reply.content.is_empty() {
            debug!("Skipping empty assistant reply");
            return;
        }
        if let Err(e) = self.history.append(reply).await {
            warn!(error = %e, "Failed to save assistant message to history");
        }
    }
}
