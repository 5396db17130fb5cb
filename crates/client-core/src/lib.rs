//! # talkbridge-client-core
//!
//! Runs calls end to end: a [`CallClient`] launches a call, a
//! [`CallDriver`] executes the orchestrator's actions against a
//! [`VoiceSessionProvider`](talkbridge_session_core::VoiceSessionProvider)
//! and schedules reconnects, and the returned [`CallHandle`] exposes the
//! call's state and action streams until it is shut down.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use talkbridge_client_core::{CallClient, ClientConfig};
//! use talkbridge_session_core::{ServiceState, VoiceServerConfig, VoiceSessionProvider};
//!
//! # async fn run(provider: Arc<dyn VoiceSessionProvider>) -> talkbridge_client_core::ClientResult<()> {
//! let server = VoiceServerConfig::load(None)?;
//! let client = CallClient::new(ClientConfig::default(), server, provider)?;
//!
//! let call = client.launch_call("talent-3", "acme", "Line cook").await?;
//! call.wait_for_state(ServiceState::is_joined).await;
//! call.hang_up()?;
//! call.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;

pub use channel::{channel_name_for, sanitize_identifier};
pub use client::{CallClient, CallHandle, CallTarget};
pub use config::{ClientConfig, ClientSettings};
pub use driver::CallDriver;
pub use error::{ClientError, ClientResult};
