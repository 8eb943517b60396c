//! Key/value storage adapters
//!
//! - [`InMemoryStorage`]: process-local, for tests and ephemeral sessions
//! - [`JsonFileStorage`]: one JSON object on disk, survives restarts

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStorage;
pub use memory::InMemoryStorage;
