//! Single-flight cancellation.
//!
//! [`CancellationController`] owns the token of the one stream attempt that
//! may be active at a time. Starting a new attempt cancels the previous
//! token before the new one is handed out, so two streams can never
//! interleave. Every attempt gets a generation number; the attempt's
//! [`StreamTicket`] clears the active slot on drop only while its generation
//! is still the current one, so a superseded stream finishing late cannot
//! mark its successor idle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Default)]
struct ControllerState {
    generation: u64,
    active: Option<CancellationToken>,
}

/// Owner of the current stream attempt's cancellation token.
#[derive(Debug, Default)]
pub struct CancellationController {
    state: Mutex<ControllerState>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new attempt, cancelling the previous one first.
    pub fn begin(self: &Arc<Self>) -> StreamTicket {
        let mut state = self.lock();
        if let Some(previous) = state.active.take() {
            debug!(
                generation = state.generation,
                "Superseding active stream"
            );
            previous.cancel();
        }
        state.generation += 1;
        let token = CancellationToken::new();
        state.active = Some(token.clone());

        StreamTicket {
            generation: state.generation,
            token,
            controller: Arc::clone(self),
        }
    }

    /// Cancel the active attempt. Returns `false` (and does nothing) when no
    /// attempt is active, so repeated calls are harmless.
    pub fn cancel(&self) -> bool {
        let mut state = self.lock();
        match state.active.take() {
            Some(token) => {
                debug!(generation = state.generation, "Cancelling active stream");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Generation of the most recent attempt (0 before the first).
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn release(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation {
            state.active = None;
        }
    }
}

/// Proof of one stream attempt. Dropping it marks the controller idle if no
/// newer attempt has started.
#[derive(Debug)]
pub struct StreamTicket {
    generation: u64,
    token: CancellationToken,
    controller: Arc<CancellationController>,
}

impl StreamTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether this attempt is still the controller's current one.
    pub fn is_current(&self) -> bool {
        self.controller.generation() == self.generation && !self.token.is_cancelled()
    }
}

impl Drop for StreamTicket {
    fn drop(&mut self) {
        self.controller.release(self.generation);
    }
}
