//! # talkbridge-session-core
//!
//! The call-session orchestrator: a state machine that reconciles the
//! events of a real-time voice provider into one call lifecycle.
//!
//! ```text
//!  DISCONNECTED --connect--> CONNECTING --onConnected--> CONNECTED --self joined--> JOINED
//!       ^                        |                           |                        |
//!       |                        +-------onDisconnected------+------------------------+
//!       |                                  (reconnect, backoff x2)
//!       +----onDisconnected---- DISCONNECTING <--disconnect-- any
//! ```
//!
//! The orchestrator only decides; it never talks to the provider itself.
//! Whoever drives it subscribes to [`ServiceAction`]s, carries them out on a
//! [`VoiceSessionProvider`], and feeds the provider's [`VoiceEvent`]s back
//! through [`CallSessionOrchestrator::handle_event`].
//!
//! ```rust
//! use talkbridge_session_core::{
//!     CallSessionOrchestrator, ReconnectPolicy, ServiceAction, ServiceState, VoiceServerConfig,
//! };
//!
//! let server = VoiceServerConfig::builder()
//!     .host("voice.example.net")
//!     .password("secret")
//!     .build()
//!     .unwrap();
//! let orchestrator = CallSessionOrchestrator::new(server, ReconnectPolicy::default());
//! let mut actions = orchestrator.subscribe_actions();
//!
//! orchestrator.connect("jobA1").unwrap();
//! assert!(matches!(actions.try_recv(), Ok(ServiceAction::Connect(_))));
//! assert!(matches!(orchestrator.state(), ServiceState::Connecting { backoff: 3, .. }));
//! ```

pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod state_table;
pub mod types;

pub use error::{SessionError, SessionResult};
pub use orchestrator::{CallSessionOrchestrator, DEFAULT_ACTION_CAPACITY};
pub use provider::{
    resolve_parent_channel, CertificateChain, Channel, ChannelRef, ChannelRequest, ConnectionError,
    ProviderError, ProviderResult, RejectReason, VoiceEvent, VoiceSessionProvider, VoiceUser,
};
pub use state_table::{CallSession, Transition, Trigger};
pub use types::{
    DisconnectCause, IdentitySlot, ReconnectPolicy, ServerDescriptor, ServiceAction, ServiceState,
    VoiceServerConfig, VoiceServerConfigBuilder, VoiceServerSettings,
};
