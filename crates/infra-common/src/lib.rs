//! # talkbridge infra-common
//!
//! Shared infrastructure used by every talkbridge crate:
//!
//! - [`logging`]: `tracing` subscriber setup
//! - [`config`]: layered configuration loading (TOML file + environment)
//! - [`tasks`]: cancellable task scopes tied to a call session
//! - [`errors`]: the common error type

pub mod config;
pub mod errors;
pub mod logging;
pub mod tasks;

pub use errors::types::{Error, Result};
pub use logging::setup::{LoggingConfig, log_welcome, parse_log_level, setup_logging};
pub use tasks::TaskScope;
