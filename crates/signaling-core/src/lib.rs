//! # talkbridge-signaling-core
//!
//! Client for the stateless HTTP signaling service that sits next to the
//! voice server: push-token registration, voip-block schedules, call offers
//! and device status reports.
//!
//! ```rust,no_run
//! use talkbridge_signaling_core::{
//!     CallRequest, SignalingConfig, SignalingEnvironment, SignalingRepository,
//! };
//!
//! # async fn run() -> talkbridge_signaling_core::SignalingResult<()> {
//! let config = SignalingConfig::builder()
//!     .security_key("shared-key")
//!     .environment(SignalingEnvironment::Test)
//!     .build()?;
//! let repo = SignalingRepository::new(config)?;
//!
//! let dispatch = repo
//!     .make_call_to_organization(CallRequest {
//!         caller: 3,
//!         callee: 9,
//!         name: "Ann".into(),
//!         device_id: "device-1".into(),
//!         job_id: 55,
//!     })
//!     .await?;
//! println!("callee will join {}", dispatch.mumble_info.channel_name);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod payloads;
pub mod repository;
pub mod transport;

pub use config::{
    CallOfferDefaults, SignalingConfig, SignalingConfigBuilder, SignalingEnvironment,
    SignalingSettings, PRODUCTION_BASE_URL, TEST_BASE_URL,
};
pub use error::{SignalingError, SignalingResult};
pub use payloads::{
    ApiMessage, CallPayload, DeviceStatusEvent, MumbleInfo, Party, VoipScheduleItem, VoipSetting,
};
pub use repository::{endpoints, CallDispatch, CallRequest, SignalingRepository};
pub use transport::{HttpTransport, SignalingTransport};
