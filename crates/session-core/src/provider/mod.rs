//! Voice-session provider contract
//!
//! The orchestrator never speaks the voice protocol itself. It relies on a
//! [`VoiceSessionProvider`] that opens the connection, manages channels and
//! reports what happens through a stream of [`VoiceEvent`]s. Any number of
//! observers may subscribe; each gets its own `broadcast` receiver over the
//! same event sequence.

pub mod certificate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

pub use certificate::{sha256_fingerprint, CertificateChain};

use crate::types::ServerDescriptor;

/// Name of the channel new call channels are created under, when present
pub const OPEN_CHANNEL_NAME: &str = "openchannel";

/// Id of the server's root channel
pub const ROOT_CHANNEL_ID: u32 = 0;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors reported by a provider
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Not connected to a voice server")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by server ({reason:?}): {message}")]
    Rejected { reason: RejectReason, message: String },

    #[error("{0}")]
    Other(String),
}

/// Why the server refused a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    WrongVersion,
    InvalidUsername,
    WrongUserPassword,
    WrongServerPassword,
    UsernameInUse,
    ServerFull,
    NoCertificate,
    AuthenticatorFail,
    Other,
}

impl RejectReason {
    /// Rejects that need new credentials; retrying with the same ones is
    /// pointless
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            RejectReason::WrongUserPassword
                | RejectReason::WrongServerPassword
                | RejectReason::AuthenticatorFail
        )
    }
}

/// Why an established or pending connection went away
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionError {
    /// Network loss or protocol failure
    Transport(String),
    /// The server refused us
    Rejected { reason: RejectReason, message: String },
}

/// A connected user as seen by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceUser {
    /// Server-assigned session id
    pub session_id: u32,
    pub name: String,
}

/// Lightweight reference to a channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: u32,
    pub name: String,
}

impl ChannelRef {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A channel with its direct subchannels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub subchannels: Vec<Channel>,
}

impl Channel {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            subchannels: Vec::new(),
        }
    }

    pub fn with_subchannels(mut self, subchannels: Vec<Channel>) -> Self {
        self.subchannels = subchannels;
        self
    }

    pub fn to_ref(&self) -> ChannelRef {
        ChannelRef::new(self.id, self.name.clone())
    }
}

/// Parameters for creating a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequest {
    pub parent_id: u32,
    pub name: String,
    pub description: String,
    pub position: i32,
    pub temporary: bool,
    pub max_users: u32,
}

impl ChannelRequest {
    /// Temporary two-party call channel, described by its own name
    pub fn call_channel(parent_id: u32, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            parent_id,
            description: name.clone(),
            name,
            position: 0,
            temporary: true,
            max_users: 2,
        }
    }
}

/// Everything a provider reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// The connection is up; `session_id` is our own user session
    Connected { session_id: u32 },
    /// The connection closed; `None` means a clean close
    Disconnected { error: Option<ConnectionError> },
    /// The server certificate was not trusted
    TlsHandshakeFailed { chain: CertificateChain },
    ChannelAdded { channel: ChannelRef },
    ChannelRemoved { channel: ChannelRef },
    UserJoinedChannel {
        user: VoiceUser,
        channel: ChannelRef,
        previous: Option<ChannelRef>,
    },
    UserRemoved { user: VoiceUser, reason: Option<String> },
    UserTalkStateChanged { user: VoiceUser, talking: bool },
    PermissionDenied { reason: String },
    LogMessage { message: String },
}

impl VoiceEvent {
    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            VoiceEvent::Connected { .. } => "Connected",
            VoiceEvent::Disconnected { .. } => "Disconnected",
            VoiceEvent::TlsHandshakeFailed { .. } => "TlsHandshakeFailed",
            VoiceEvent::ChannelAdded { .. } => "ChannelAdded",
            VoiceEvent::ChannelRemoved { .. } => "ChannelRemoved",
            VoiceEvent::UserJoinedChannel { .. } => "UserJoinedChannel",
            VoiceEvent::UserRemoved { .. } => "UserRemoved",
            VoiceEvent::UserTalkStateChanged { .. } => "UserTalkStateChanged",
            VoiceEvent::PermissionDenied { .. } => "PermissionDenied",
            VoiceEvent::LogMessage { .. } => "LogMessage",
        }
    }
}

/// A real-time voice-session backend
#[async_trait]
pub trait VoiceSessionProvider: Send + Sync {
    /// Start connecting. The outcome arrives later as exactly one of
    /// `Connected`, `Disconnected` or `TlsHandshakeFailed`.
    async fn connect(&self, server: ServerDescriptor) -> ProviderResult<()>;

    /// Close the connection; a `Disconnected` event follows
    async fn disconnect(&self) -> ProviderResult<()>;

    fn is_connected(&self) -> bool;

    /// Our own session id once connected
    fn session_id(&self) -> Option<u32>;

    /// The channel our user is in, with its direct subchannels
    fn session_channel(&self) -> Option<Channel>;

    /// Create a channel and return its id
    async fn create_channel(&self, request: ChannelRequest) -> ProviderResult<u32>;

    async fn join_channel(&self, channel_id: u32) -> ProviderResult<()>;

    /// Register the user behind `session_id` with the server
    async fn register_user(&self, session_id: u32) -> ProviderResult<()>;

    /// New observer of the event stream
    fn subscribe(&self) -> broadcast::Receiver<VoiceEvent>;
}

/// Parent for a new call channel: the `openchannel` among the session
/// channel's direct subchannels or the session channel itself, else root.
pub fn resolve_parent_channel(session_channel: Option<&Channel>) -> u32 {
    let Some(session_channel) = session_channel else {
        return ROOT_CHANNEL_ID;
    };

    session_channel
        .subchannels
        .iter()
        .chain(std::iter::once(session_channel))
        .find(|channel| channel.name == OPEN_CHANNEL_NAME)
        .map(|channel| channel.id)
        .unwrap_or(ROOT_CHANNEL_ID)
}
