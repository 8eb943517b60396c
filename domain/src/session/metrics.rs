//! Stream measurements

use super::stream::StreamDelta;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Measurements of one finished stream. Every field is optional; the empty
/// value is what a freshly started stream reports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_per_second: Option<f64>,
}

impl ChatMetrics {
    pub fn with_token_count(mut self, token_count: u64) -> Self {
        self.token_count = Some(token_count);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.token_count.is_none() && self.latency_ms.is_none() && self.tokens_per_second.is_none()
    }
}

/// Measures a stream while it is relayed.
///
/// Each non-empty text delta counts as one token; the gateway does not
/// report usage on streamed responses. Latency is the time to the first
/// text delta.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    started: Instant,
    first_delta: Option<Instant>,
    tokens: u64,
}

impl MetricsRecorder {
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self {
            started,
            first_delta: None,
            tokens: 0,
        }
    }

    pub fn record(&mut self, delta: &StreamDelta) {
        self.record_at(delta, Instant::now());
    }

    pub fn record_at(&mut self, delta: &StreamDelta, at: Instant) {
        if delta.content.is_empty() {
            return;
        }
        self.first_delta.get_or_insert(at);
        self.tokens += 1;
    }

    pub fn finish(&self) -> ChatMetrics {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(&self, now: Instant) -> ChatMetrics {
        let Some(first) = self.first_delta else {
            return ChatMetrics::default().with_token_count(0);
        };
        let latency = first.saturating_duration_since(self.started);
        let generating = now.saturating_duration_since(first).as_secs_f64();
        ChatMetrics {
            token_count: Some(self.tokens),
            latency_ms: Some(latency.as_millis() as u64),
            tokens_per_second: (generating > 0.0).then(|| self.tokens as f64 / generating),
        }
    }
}
