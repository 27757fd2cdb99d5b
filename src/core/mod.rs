//! Core system types and foundations
//!
//! Error handling, configuration, logging setup and the application state
//! shared by the transport layer.

pub mod error;
pub mod config;
pub mod logging;
pub mod app_state;
pub mod factory;

// Re-export commonly used items
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use config::Config;
pub use app_state::AppState;
