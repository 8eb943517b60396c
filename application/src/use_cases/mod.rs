//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod chat_controller;
pub mod manage_history;
pub mod manage_settings;
pub mod send_message;
pub mod stop_stream;

#[cfg(test)]
pub(crate) mod test_support;
