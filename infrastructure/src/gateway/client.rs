//! HTTP streaming client for the chat completions endpoint

use super::decoder::{FrameDecoder, Utf8Carry};
use super::protocol::ChatCompletionRequest;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use streamchat_application::{
    CancellationController, ChatGateway, DeltaResult, DeltaStream, GatewayError, StreamTicket,
};
use streamchat_domain::{ChatMessage, ChatParams};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fireworks inference endpoint, OpenAI-compatible.
pub const DEFAULT_BASE_URL: &str = "https://api.fireworks.ai/inference/v1";

/// Connection settings for [`StreamingChatClient`]
#[derive(Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// [`ChatGateway`] over HTTP.
///
/// At most one request is in flight: [`open_stream`](ChatGateway::open_stream)
/// cancels the previous stream before returning the new one. The request
/// itself is sent when the returned stream is first polled.
pub struct StreamingChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    controller: Arc<CancellationController>,
}

impl StreamingChatClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Configuration(format!("HTTP client: {}", e)))?;
        Self::with_http_client(config, http)
    }

    /// Use a preconfigured [`reqwest::Client`] (proxies, timeouts, ...).
    pub fn with_http_client(
        config: GatewayConfig,
        http: reqwest::Client,
    ) -> Result<Self, GatewayError> {
        if config.api_key.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "API key is required".to_string(),
            ));
        }
        if config.base_url.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "Base URL is required".to_string(),
            ));
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            controller: Arc::new(CancellationController::new()),
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl fmt::Debug for StreamingChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingChatClient")
            .field("base_url", &self.base_url)
            .field("streaming", &self.controller.is_active())
            .finish_non_exhaustive()
    }
}

impl ChatGateway for StreamingChatClient {
    fn open_stream(&self, messages: &[ChatMessage], params: &ChatParams) -> DeltaStream {
        let ticket = self.controller.begin();
        let token = ticket.token().clone();

        debug!(
            generation = ticket.generation(),
            model = %params.model,
            messages = messages.len(),
            "Opening chat stream"
        );

        let request = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&ChatCompletionRequest::streaming(messages, params));

        DeltaStream::new(request_deltas(request, ticket), token)
    }

    fn stop_stream(&self) {
        if self.controller.cancel() {
            debug!("Chat stream stopped");
        }
    }

    fn is_streaming(&self) -> bool {
        self.controller.is_active()
    }
}

/// Send `request` and decode its body. The ticket lives as long as the
/// stream, so the client turns idle on every exit path.
fn request_deltas(
    request: reqwest::RequestBuilder,
    ticket: StreamTicket,
) -> impl Stream<Item = DeltaResult> + Send + 'static {
    async_stream::stream! {
        let ticket = ticket;
        let token = ticket.token().clone();

        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(generation = ticket.generation(), "Chat stream cancelled before request");
                return;
            }
            sent = request.send() => sent,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!("Chat request failed: {}", e);
                yield Err(GatewayError::Connection(e.to_string()));
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                body = response.text() => body.unwrap_or_else(|e| {
                    debug!("Could not read error response body: {}", e);
                    String::new()
                }),
            };
            warn!(status = status.as_u16(), "Chat API returned an error");
            yield Err(GatewayError::Network {
                status: status.as_u16(),
                body,
            });
            return;
        }

        let deltas = decode_body(response.bytes_stream(), token);
        futures::pin_mut!(deltas);
        while let Some(item) = deltas.next().await {
            yield item;
        }
        debug!(generation = ticket.generation(), "Chat stream closed");
    }
}

/// Decode a byte stream into deltas until `finished`, an error, end of body
/// or cancellation, whichever comes first. Bytes after `finished` are never
/// read.
pub(crate) fn decode_body<S, E>(
    body: S,
    token: CancellationToken,
) -> impl Stream<Item = DeltaResult> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    async_stream::stream! {
        futures::pin_mut!(body);
        let mut carry = Utf8Carry::new();
        let mut decoder = FrameDecoder::new();
        let mut received = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                next = body.next() => next,
            };

            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    if token.is_cancelled() {
                        return;
                    }
                    yield Err(GatewayError::stream_with("Error reading stream", e));
                    return;
                }
                None => break,
            };
            received += chunk.len();

            let text = carry.push(&chunk);
            let deltas = match decoder.feed(&text) {
                Ok(deltas) => deltas,
                Err(e) => {
                    warn!("{}", e);
                    yield Err(e.into());
                    return;
                }
            };

            for delta in deltas {
                let finished = delta.finished;
                yield Ok(delta);
                if finished || token.is_cancelled() {
                    return;
                }
            }
        }

        if received == 0 {
            yield Err(GatewayError::stream("No response body received"));
            return;
        }

        let tail = carry.finish();
        if !tail.is_empty() || !decoder.buffered().trim().is_empty() {
            debug!(
                "Discarding unterminated frame at end of stream ({} bytes)",
                decoder.buffered().len() + tail.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use mockito::Matcher;
    use serde_json::json;
    use streamchat_domain::StreamDelta;

    const SSE_BODY: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    fn ok(bytes: &'static [u8]) -> Result<&'static [u8], std::io::Error> {
        Ok(bytes)
    }

    fn bytes_body(
        chunks: Vec<Result<&'static [u8], std::io::Error>>,
    ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
        stream::iter(
            chunks
                .into_iter()
                .map(|chunk| chunk.map(Bytes::from_static)),
        )
    }

    async fn collect(stream: impl Stream<Item = DeltaResult>) -> Vec<DeltaResult> {
        stream.collect().await
    }

    fn client(base_url: &str) -> StreamingChatClient {
        StreamingChatClient::new(GatewayConfig::new(base_url, "test-key")).unwrap()
    }

    // ==================== decode_body ====================

    #[tokio::test]
    async fn decode_body_reassembles_split_frames() {
        let body = bytes_body(vec![
            ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"caf"),
            ok(b"\xc3"),
            ok(b"\xa9\"}}]}\n"),
            ok(b"\ndata: [DO"),
            ok(b"NE]\n\n"),
        ]);
        let items = collect(decode_body(body, CancellationToken::new())).await;
        let deltas: Vec<StreamDelta> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            deltas,
            vec![StreamDelta::text("café"), StreamDelta::finished()]
        );
    }

    #[tokio::test]
    async fn decode_body_stops_reading_after_finished() {
        let body = bytes_body(vec![
            ok(b"data: [DONE]\n"),
            ok(b"data: {broken\n"),
        ]);
        let items = collect(decode_body(body, CancellationToken::new())).await;
        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap().finished);
    }

    #[tokio::test]
    async fn decode_body_reports_read_errors() {
        let body = bytes_body(vec![
            ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n"),
            Err(std::io::Error::other("connection reset")),
        ]);
        let items = collect(decode_body(body, CancellationToken::new())).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().content, "a");
        match &items[1] {
            Err(GatewayError::Stream { message, source }) => {
                assert_eq!(message, "Error reading stream");
                assert!(source.is_some());
            }
            other => panic!("expected stream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn decode_body_reports_malformed_frames() {
        let body = bytes_body(vec![ok(b"data: {oops}\n")]);
        let items = collect(decode_body(body, CancellationToken::new())).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(GatewayError::Decode { .. })));
    }

    #[tokio::test]
    async fn decode_body_without_bytes_is_an_error() {
        let body = bytes_body(vec![]);
        let items = collect(decode_body(body, CancellationToken::new())).await;
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().unwrap_err().to_string(),
            "Stream error: No response body received"
        );
    }

    #[tokio::test]
    async fn decode_body_ends_quietly_without_done() {
        let body = bytes_body(vec![ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: {\"cho",
        )]);
        let items = collect(decode_body(body, CancellationToken::new())).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), &StreamDelta::text("a"));
    }

    #[tokio::test]
    async fn cancel_unblocks_a_pending_read() {
        let token = CancellationToken::new();
        let body = stream::pending::<Result<Bytes, std::io::Error>>();
        let deltas = decode_body(body, token.clone());
        futures::pin_mut!(deltas);

        let (next, ()) = tokio::join!(deltas.next(), async {
            tokio::task::yield_now().await;
            token.cancel();
        });
        assert!(next.is_none());
    }

    // ==================== StreamingChatClient ====================

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = StreamingChatClient::new(GatewayConfig::new(DEFAULT_BASE_URL, "  ")).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn config_debug_redacts_api_key() {
        let config = GatewayConfig::new(DEFAULT_BASE_URL, "sk-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn completions_url_ignores_trailing_slash() {
        let client = client("http://localhost:9/v1/");
        assert_eq!(client.completions_url(), "http://localhost:9/v1/chat/completions");
    }

    #[tokio::test]
    async fn streams_deltas_from_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-model",
                "messages": [{"role": "user", "content": "Hi"}],
                "max_tokens": 16,
                "stream": true
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(SSE_BODY)
            .create_async()
            .await;

        let client = client(&server.url());
        let params = ChatParams::new("test-model", 0.2, 16);
        let stream = client.open_stream(&[ChatMessage::user("Hi")], &params);
        assert!(client.is_streaming());

        let items = collect(stream).await;
        let deltas: Vec<StreamDelta> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            deltas,
            vec![
                StreamDelta::text("Hello"),
                StreamDelta::text(" there"),
                StreamDelta::finished(),
            ]
        );
        assert!(!client.is_streaming());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_a_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let client = client(&server.url());
        let items = collect(client.open_stream(&[ChatMessage::user("Hi")], &ChatParams::default()))
            .await;

        assert_eq!(items.len(), 1);
        let err = items[0].as_ref().unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Network { status: 401, body } if body == "invalid api key"
        ));
        assert_eq!(err.to_string(), "Chat API error: 401 - invalid api key");
        assert_eq!(err.code(), "NETWORK_ERROR");
        assert!(!client.is_streaming());
    }

    #[tokio::test]
    async fn empty_success_body_is_a_stream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .create_async()
            .await;

        let client = client(&server.url());
        let items = collect(client.open_stream(&[ChatMessage::user("Hi")], &ChatParams::default()))
            .await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap_err().code(), "STREAM_ERROR");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let client = client("http://127.0.0.1:1");
        let items = collect(client.open_stream(&[ChatMessage::user("Hi")], &ChatParams::default()))
            .await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(GatewayError::Connection(_))));
    }

    #[tokio::test]
    async fn second_open_supersedes_the_first() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(SSE_BODY)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url());
        let first = client.open_stream(&[ChatMessage::user("one")], &ChatParams::default());
        let second = client.open_stream(&[ChatMessage::user("two")], &ChatParams::default());

        assert!(first.is_cancelled());
        assert!(collect(first).await.is_empty());
        assert!(client.is_streaming());

        let text = second.collect_text().await.unwrap();
        assert_eq!(text, "Hello there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn new_attempt_ends_a_stream_blocked_mid_body() {
        let controller = Arc::new(CancellationController::new());
        let first_ticket = controller.begin();
        let body = bytes_body(vec![ok(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n",
        )])
        .chain(stream::pending());
        let first = decode_body(body, first_ticket.token().clone());
        futures::pin_mut!(first);

        let delta = first.next().await.unwrap().unwrap();
        assert_eq!(delta, StreamDelta::text("partial"));

        let second_ticket = controller.begin();
        let next = tokio::time::timeout(std::time::Duration::from_secs(1), first.next())
            .await
            .expect("first stream should end once superseded");
        assert!(next.is_none());

        drop(first_ticket);
        assert!(controller.is_active());
        assert!(second_ticket.is_current());
    }

    #[tokio::test]
    async fn stop_before_first_poll_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(SSE_BODY)
            .expect(0)
            .create_async()
            .await;

        let client = client(&server.url());
        let stream = client.open_stream(&[ChatMessage::user("Hi")], &ChatParams::default());
        client.stop_stream();
        client.stop_stream();

        assert!(!client.is_streaming());
        assert!(collect(stream).await.is_empty());
        mock.assert_async().await;
    }

    #[test]
    fn stop_without_stream_is_a_no_op() {
        let client = client(DEFAULT_BASE_URL);
        client.stop_stream();
        assert!(!client.is_streaming());
    }
}
