//! Streaming deltas of a chat completion.
//!
//! A completion is delivered as a sequence of [`StreamDelta`]s. Every delta
//! but the last carries a text fragment; the last one has `finished` set and
//! usually an empty `content`.

use serde::{Deserialize, Serialize};

/// An incremental fragment of generated text plus a completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Text fragment (may be empty)
    pub content: String,
    /// Marks end of stream
    pub finished: bool,
}

impl StreamDelta {
    /// A text fragment from the model.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finished: false,
        }
    }

    /// The end-of-stream marker.
    pub fn finished() -> Self {
        Self {
            content: String::new(),
            finished: true,
        }
    }

    /// Returns true if this delta signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_delta_is_not_terminal() {
        let delta = StreamDelta::text("hello");
        assert_eq!(delta.content, "hello");
        assert!(!delta.is_terminal());
    }

    #[test]
    fn finished_delta_is_terminal_and_empty() {
        let delta = StreamDelta::finished();
        assert!(delta.is_terminal());
        assert!(delta.content.is_empty());
    }
}
