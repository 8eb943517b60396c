//! Domain layer for streamchat
//!
//! This crate contains the core entities, value objects and the session
//! state machine. It has no dependencies on infrastructure or presentation
//! concerns.
//!
//! # Core Concepts
//!
//! ## Stream deltas
//!
//! A chat completion arrives as a sequence of [`StreamDelta`]s: text
//! fragments followed by a single `finished` marker.
//!
//! ## Session state
//!
//! [`SessionState`] is evolved only through [`reduce`], a pure function over
//! `(state, event)`. States are shared as `Arc`s, and an event that changes
//! nothing hands back the very same `Arc`.

pub mod core;
pub mod session;
pub mod util;

// Re-export commonly used types
pub use core::error::DomainError;
pub use session::{
    entities::{ChatMessage, MessageId, Role},
    metrics::{ChatMetrics, MetricsRecorder},
    params::ChatParams,
    state::{SessionEvent, SessionState, reduce},
    stream::StreamDelta,
};
