//! Session state machine.
//!
//! [`SessionState`] is what a client renders: the committed conversation,
//! the text of the reply currently being streamed, the metrics of the last
//! finished stream and the last error. It only changes through [`reduce`].
//!
//! States are handed around as `Arc<SessionState>`. Every handled event
//! produces a new `Arc`, except `ErrorCleared` with no error set, which
//! returns the *same* `Arc` so observers can use `Arc::ptr_eq` to skip it.

use super::entities::ChatMessage;
use super::metrics::ChatMetrics;
use std::sync::Arc;

/// Renderable state of one chat session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    /// Committed conversation, append-only except for explicit clear/replace
    pub messages: Vec<ChatMessage>,
    pub is_streaming: bool,
    /// Text accumulated from the stream in flight
    pub current_stream_content: String,
    pub metrics: ChatMetrics,
    pub error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Events that drive the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A message was committed (usually the user's prompt).
    MessageAdded(ChatMessage),
    /// A new reply started streaming.
    StreamStarted,
    /// A text fragment of the reply arrived.
    StreamDelta(String),
    /// The reply finished; its text becomes an assistant message.
    StreamEnded(ChatMetrics),
    /// The stream failed.
    StreamError(String),
    /// Replace the conversation with persisted history.
    HistoryLoaded(Vec<ChatMessage>),
    HistoryCleared,
    ErrorCleared,
}

impl SessionEvent {
    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::MessageAdded(_) => "message_added",
            SessionEvent::StreamStarted => "stream_started",
            SessionEvent::StreamDelta(_) => "stream_delta",
            SessionEvent::StreamEnded(_) => "stream_ended",
            SessionEvent::StreamError(_) => "stream_error",
            SessionEvent::HistoryLoaded(_) => "history_loaded",
            SessionEvent::HistoryCleared => "history_cleared",
            SessionEvent::ErrorCleared => "error_cleared",
        }
    }
}

/// Compute the state that follows `state` after `event`.
///
/// Clearing an absent error returns `state` itself; every other event
/// yields a new state, even when its contents are equal.
pub fn reduce(state: &Arc<SessionState>, event: SessionEvent) -> Arc<SessionState> {
    match event {
        SessionEvent::MessageAdded(message) => {
            let mut next = SessionState::clone(state);
            next.messages.push(message);
            next.error = None;
            Arc::new(next)
        }
        SessionEvent::StreamStarted => Arc::new(SessionState {
            is_streaming: true,
            current_stream_content: String::new(),
            metrics: ChatMetrics::default(),
            error: None,
            messages: state.messages.clone(),
        }),
        SessionEvent::StreamDelta(text) => {
            let mut next = SessionState::clone(state);
            next.current_stream_content.push_str(&text);
            Arc::new(next)
        }
        SessionEvent::StreamEnded(metrics) => {
            let mut next = SessionState::clone(state);
            let content = std::mem::take(&mut next.current_stream_content);
            next.messages.push(ChatMessage::assistant(content));
            next.is_streaming = false;
            next.metrics = metrics;
            Arc::new(next)
        }
        SessionEvent::StreamError(message) => {
            let mut next = SessionState::clone(state);
            next.is_streaming = false;
            next.current_stream_content.clear();
            next.error = Some(message);
            Arc::new(next)
        }
        SessionEvent::HistoryLoaded(messages) => {
            let mut next = SessionState::clone(state);
            next.messages = messages;
            Arc::new(next)
        }
        SessionEvent::HistoryCleared => {
            let mut next = SessionState::clone(state);
            next.messages.clear();
            Arc::new(next)
        }
        SessionEvent::ErrorCleared => {
            if state.error.is_none() {
                return Arc::clone(state);
            }
            let mut next = SessionState::clone(state);
            next.error = None;
            Arc::new(next)
        }
    }
}
