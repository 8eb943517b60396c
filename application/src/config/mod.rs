//! Application-level configuration.
//!
//! - [`ParamsPatch`]: partial [`ChatParams`](streamchat_domain::ChatParams)
//!   overrides, used both for stored settings and per-request overrides

pub mod params_patch;

pub use params_patch::ParamsPatch;
