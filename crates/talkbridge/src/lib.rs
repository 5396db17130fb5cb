//! # talkbridge - call sessions over a Mumble-style voice server
//!
//! This crate bundles the talkbridge stack behind one dependency.
//!
//! ## Overview
//!
//! - **Infra Common**: logging, layered configuration, task scopes
//! - **Signaling Core**: HTTP client for push tokens, voip schedules, call
//!   offers and device status reports
//! - **Session Core**: the call-session state machine and the voice provider
//!   contract
//! - **Client Core**: drives a session against a provider, with reconnects
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use talkbridge::prelude::*;
//!
//! # async fn run(provider: Arc<dyn VoiceSessionProvider>) -> ClientResult<()> {
//! let app = Talkbridge::init(Some("talkbridge.toml".as_ref()), provider)?;
//!
//! let (offer, call) = app
//!     .place_call(CallRequest {
//!         caller: 3,
//!         callee: 7,
//!         name: "Sam".into(),
//!         device_id: "device-1".into(),
//!         job_id: 11,
//!     })
//!     .await?;
//! println!("ringing on {}", offer.mumble_info.channel_name);
//!
//! call.wait_for_state(ServiceState::is_joined).await;
//! call.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - [`infra_common`]: shared infrastructure
//! - [`signaling_core`]: signaling HTTP client
//! - [`session_core`]: session orchestration
//! - [`client_core`]: call driver and entry points

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

mod app;

// Re-export all crates as modules
pub use talkbridge_client_core as client_core;
pub use talkbridge_infra_common as infra_common;
pub use talkbridge_session_core as session_core;
pub use talkbridge_signaling_core as signaling_core;

pub use app::{LoggingSettings, Talkbridge, TalkbridgeConfig};

// Re-export commonly used items for convenience
pub mod prelude {
    //! Common imports for talkbridge applications

    pub use crate::client_core::*;
    pub use crate::session_core::*;
    pub use crate::signaling_core::*;
    pub use crate::{Talkbridge, TalkbridgeConfig};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
