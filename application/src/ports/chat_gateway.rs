//! Chat gateway port
//!
//! Defines the interface for streaming completions from a chat provider and
//! the [`DeltaStream`] handle the gateway hands back.

use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use streamchat_domain::{ChatMessage, ChatParams, StreamDelta};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Boxed error used as the `source` of gateway failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during gateway operations
///
/// Cancellation is deliberately absent: a cancelled stream simply ends.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Chat API error: {status} - {body}")]
    Network { status: u16, body: String },

    #[error("Stream error: {message}")]
    Stream {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Failed to parse stream chunk: {payload}")]
    Decode {
        payload: String,
        #[source]
        source: BoxError,
    },
}

impl GatewayError {
    pub fn stream(message: impl Into<String>) -> Self {
        GatewayError::Stream {
            message: message.into(),
            source: None,
        }
    }

    pub fn stream_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GatewayError::Stream {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Stable error code reported to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "CONFIGURATION_ERROR",
            GatewayError::Connection(_) | GatewayError::Network { .. } => "NETWORK_ERROR",
            GatewayError::Stream { .. } | GatewayError::Decode { .. } => "STREAM_ERROR",
        }
    }
}

/// Item type of a [`DeltaStream`].
pub type DeltaResult = Result<StreamDelta, GatewayError>;

/// A lazy, finite, non-restartable sequence of [`StreamDelta`]s bound to the
/// cancellation token of the request that produces it.
///
/// Once the token is cancelled the stream yields nothing more and drops its
/// producer, which releases the underlying transport.
pub struct DeltaStream {
    inner: BoxStream<'static, DeltaResult>,
    token: CancellationToken,
}

impl DeltaStream {
    pub fn new<S>(inner: S, token: CancellationToken) -> Self
    where
        S: Stream<Item = DeltaResult> + Send + 'static,
    {
        Self {
            inner: inner.boxed(),
            token,
        }
    }

    /// A stream that ends immediately.
    pub fn empty() -> Self {
        Self::new(stream::empty(), CancellationToken::new())
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel the request behind this stream. The stream then ends silently.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wrap the producer while keeping the same token.
    pub fn map_inner<F, S>(self, f: F) -> Self
    where
        F: FnOnce(BoxStream<'static, DeltaResult>) -> S,
        S: Stream<Item = DeltaResult> + Send + 'static,
    {
        let token = self.token;
        Self::new(f(self.inner), token)
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(mut self) -> Result<String, GatewayError> {
        let mut full_text = String::new();
        while let Some(delta) = self.next().await {
            let delta = delta?;
            full_text.push_str(&delta.content);
            if delta.finished {
                break;
            }
        }
        Ok(full_text)
    }
}

impl Stream for DeltaStream {
    type Item = DeltaResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.token.is_cancelled() {
            this.inner = stream::empty().boxed();
            return Poll::Ready(None);
        }
        this.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for DeltaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaStream")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Gateway for streaming chat completions
///
/// Implementations own at most one in-flight request: opening a stream
/// supersedes the previous one. Adapters live in the infrastructure layer.
pub trait ChatGateway: Send + Sync {
    /// Start a completion for `messages`. The request is issued lazily when
    /// the returned stream is first polled; any previous stream is cancelled
    /// before this call returns.
    fn open_stream(&self, messages: &[ChatMessage], params: &ChatParams) -> DeltaStream;

    /// Cancel the in-flight stream, if any. Idempotent.
    fn stop_stream(&self);

    /// Whether a stream is currently open.
    fn is_streaming(&self) -> bool;
}
