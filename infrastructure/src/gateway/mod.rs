//! Chat completions gateway adapter
//!
//! Implements [`ChatGateway`](streamchat_application::ChatGateway) for
//! OpenAI-compatible `/chat/completions` endpoints that stream
//! `data: <json>` frames.

pub mod client;
pub mod decoder;
pub mod error;
pub mod protocol;
