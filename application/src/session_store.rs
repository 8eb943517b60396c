//! Session store: the single owner of a session's state.
//!
//! Wraps the pure [`reduce`] function with an explicit observer list.
//! [`SessionStore::dispatch`] takes `&mut self`, so the borrow checker
//! enforces the single-writer rule; hosts that share a store across tasks
//! put it behind a mutex or a dedicated owning task.

use std::fmt;
use std::sync::Arc;
use streamchat_domain::{SessionEvent, SessionState, reduce};
use tracing::trace;

/// Callback invoked with the new state after every effective dispatch.
pub type Listener = Box<dyn FnMut(&Arc<SessionState>) + Send>;

/// Handle returned by [`SessionStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct SessionStore {
    state: Arc<SessionState>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_state(SessionState::new())
    }

    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: Arc::new(state),
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&Arc<SessionState>) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Apply `event`. Listeners run only if the reducer produced a new state.
    /// Returns whether the state changed.
    pub fn dispatch(&mut self, event: SessionEvent) -> bool {
        let kind = event.kind();
        let next = reduce(&self.state, event);
        if Arc::ptr_eq(&next, &self.state) {
            trace!(event = kind, "Session event left state unchanged");
            return false;
        }

        self.state = next;
        trace!(
            event = kind,
            listeners = self.listeners.len(),
            "Session state updated"
        );
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
        true
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
