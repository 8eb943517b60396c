//! Stop Stream use case.

use crate::ports::chat_gateway::ChatGateway;
use std::sync::Arc;
use tracing::info;

/// Cancels the stream in flight. Cheap to clone, so it can be handed to a
/// signal handler or UI task while another task consumes the stream.
#[derive(Clone)]
pub struct StopStreamUseCase {
    gateway: Arc<dyn ChatGateway>,
}

impl StopStreamUseCase {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    pub fn execute(&self) {
        info!(active = self.gateway.is_streaming(), "Stopping stream");
        self.gateway.stop_stream();
    }

    /// Whether there is a stream to stop.
    pub fn is_active(&self) -> bool {
        self.gateway.is_streaming()
    }
}
