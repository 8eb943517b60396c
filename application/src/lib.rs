//! Application layer for streamchat
//!
//! This crate contains use cases, port definitions, the single-flight
//! cancellation controller and the session store. It depends only on the
//! domain layer.

pub mod cancellation;
pub mod config;
pub mod ports;
pub mod session_store;
pub mod use_cases;

// Re-export commonly used types
pub use cancellation::{CancellationController, StreamTicket};
pub use config::ParamsPatch;
pub use ports::{
    chat_gateway::{BoxError, ChatGateway, DeltaResult, DeltaStream, GatewayError},
    storage::{StorageError, StoragePort},
};
pub use session_store::{Listener, SessionStore, SubscriptionId};
pub use use_cases::chat_controller::{ChatController, SubmitOutcome};
pub use use_cases::manage_history::{
    ClearHistoryUseCase, DEFAULT_HISTORY_LIMIT, HISTORY_KEY, HistoryRepository,
    LoadHistoryUseCase,
};
pub use use_cases::manage_settings::{SETTINGS_KEY, SettingsError, SettingsStore};
pub use use_cases::send_message::{SendMessageError, SendMessageUseCase};
pub use use_cases::stop_stream::StopStreamUseCase;
