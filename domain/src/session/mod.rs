//! Chat session domain.
//!
//! - [`entities::ChatMessage`]: a single immutable message in the conversation
//! - [`params::ChatParams`]: sampling parameters for one completion request
//! - [`stream::StreamDelta`]: one incremental fragment of a streamed reply
//! - [`metrics::ChatMetrics`]: measurements of a finished stream
//! - [`state::SessionState`]: the renderable session state and its reducer

pub mod entities;
pub mod metrics;
pub mod params;
pub mod state;
pub mod stream;
