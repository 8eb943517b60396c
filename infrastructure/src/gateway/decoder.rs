//! Incremental decoding of the `data:` line stream
//!
//! Network reads split the body at arbitrary byte offsets. [`Utf8Carry`]
//! holds back an incomplete trailing character until its remaining bytes
//! arrive, and [`FrameDecoder`] holds back an incomplete trailing line.
//! Feeding the same body in any chunking yields the same deltas.

use super::error::DecodeError;
use super::protocol::{ChatCompletionChunk, DATA_PREFIX, DONE_SENTINEL};
use streamchat_domain::StreamDelta;

/// Line-buffered decoder turning text chunks into [`StreamDelta`]s.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and decode every line it completes.
    ///
    /// The text after the last `\n` stays buffered for the next call. A
    /// single line may produce both a text delta and a `finished` delta.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<StreamDelta>, DecodeError> {
        self.buffer.push_str(chunk);
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Ok(Vec::new());
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        let mut deltas = Vec::new();
        for line in complete.split('\n') {
            decode_line(line, &mut deltas)?;
        }
        Ok(deltas)
    }

    /// Text received after the last line break.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

fn decode_line(line: &str, out: &mut Vec<StreamDelta>) -> Result<(), DecodeError> {
    let line = line.trim();
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(());
    };
    let payload = payload.trim();

    if payload == DONE_SENTINEL {
        out.push(StreamDelta::finished());
        return Ok(());
    }

    let chunk: ChatCompletionChunk =
        serde_json::from_str(payload).map_err(|source| DecodeError {
            payload: payload.to_string(),
            source,
        })?;

    if let Some(content) = chunk.content() {
        out.push(StreamDelta::text(content));
    }
    if chunk.is_finished() {
        out.push(StreamDelta::finished());
    }
    Ok(())
}

/// Streaming UTF-8 decoder that never splits a multi-byte character.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + bytes` as forms complete characters.
    /// Invalid sequences become U+FFFD; an incomplete trailing character is
    /// held back even when invalid bytes precede it.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::with_capacity(self.pending.len());
        let mut consumed = 0;

        while consumed < self.pending.len() {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    consumed = self.pending.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid + invalid;
                        }
                        // Incomplete sequence at the end: keep it for the next read
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        text
    }

    /// Flush whatever is held back, lossily.
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
