//! Session state, actions and configuration values
//!
//! [`ServiceState`] is the single value observers watch; [`ServiceAction`]
//! is what the orchestrator asks its driver to do. Both are plain data and
//! cheap to clone.

use std::fmt;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};
use crate::provider::{CertificateChain, ChannelRef, RejectReason};

/// Default voice server port
pub const DEFAULT_VOICE_PORT: u16 = 64738;

/// Prefix of randomly generated display names
pub const EPHEMERAL_USERNAME_PREFIX: &str = "UserR_";

/// Where a connection's client identity comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentitySlot {
    /// Throwaway identity generated for this attempt
    Ephemeral,
    /// A stored identity, by key
    Persisted(String),
}

/// Everything needed for one connection attempt
#[derive(Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub identity: IdentitySlot,
}

impl ServerDescriptor {
    /// Fresh descriptor with a random `UserR_<n>` display name
    pub fn ephemeral(config: &VoiceServerConfig) -> Self {
        let n: u32 = rand::thread_rng().gen_range(0..1000);
        Self {
            host: config.host().to_string(),
            port: config.port(),
            username: format!("{}{}", EPHEMERAL_USERNAME_PREFIX, n),
            password: config.password().to_string(),
            identity: IdentitySlot::Ephemeral,
        }
    }
}

impl fmt::Debug for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Why the session is disconnected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectCause {
    /// Never connected yet
    Idle,
    /// Local `disconnect()`
    Requested,
    ConnectionLost(String),
    /// Server certificate needs an explicit trust decision
    UntrustedCertificate(CertificateChain),
    Rejected { reason: RejectReason, message: String },
    PermissionDenied(String),
}

impl DisconnectCause {
    /// Whether retrying cannot help without user intervention
    pub fn is_terminal(&self) -> bool {
        match self {
            DisconnectCause::UntrustedCertificate(_) | DisconnectCause::PermissionDenied(_) => true,
            DisconnectCause::Rejected { reason, .. } => reason.is_authentication_failure(),
            _ => false,
        }
    }
}

/// Observable state of one call session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Disconnected {
        channel_name: String,
        reconnect: bool,
        backoff: u32,
        cause: DisconnectCause,
    },
    Connecting {
        channel_name: String,
        backoff: u32,
    },
    Connected {
        channel_name: String,
        registered: bool,
    },
    Joined {
        channel_name: String,
    },
    Disconnecting {
        channel_name: String,
        backoff: u32,
    },
}

impl ServiceState {
    pub fn channel_name(&self) -> &str {
        match self {
            ServiceState::Disconnected { channel_name, .. }
            | ServiceState::Connecting { channel_name, .. }
            | ServiceState::Connected { channel_name, .. }
            | ServiceState::Joined { channel_name }
            | ServiceState::Disconnecting { channel_name, .. } => channel_name,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServiceState::Disconnected { .. } => "DISCONNECTED",
            ServiceState::Connecting { .. } => "CONNECTING",
            ServiceState::Connected { .. } => "CONNECTED",
            ServiceState::Joined { .. } => "JOINED",
            ServiceState::Disconnecting { .. } => "DISCONNECTING",
        }
    }

    /// Whether the driver should schedule a reconnect, and after how long
    pub fn reconnect_after(&self) -> Option<u32> {
        match self {
            ServiceState::Disconnected {
                reconnect: true,
                backoff,
                ..
            } => Some(*backoff),
            _ => None,
        }
    }

    pub fn is_joined(&self) -> bool {
        matches!(self, ServiceState::Joined { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, ServiceState::Disconnected { .. })
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Disconnected {
                channel_name,
                reconnect,
                backoff,
                ..
            } => write!(
                f,
                "DISCONNECTED({}, reconnect={}, backoff={})",
                channel_name, reconnect, backoff
            ),
            ServiceState::Connecting {
                channel_name,
                backoff,
            } => write!(f, "CONNECTING({}, backoff={})", channel_name, backoff),
            ServiceState::Connected {
                channel_name,
                registered,
            } => write!(f, "CONNECTED({}, registered={})", channel_name, registered),
            ServiceState::Joined { channel_name } => write!(f, "JOINED({})", channel_name),
            ServiceState::Disconnecting {
                channel_name,
                backoff,
            } => write!(f, "DISCONNECTING({}, backoff={})", channel_name, backoff),
        }
    }
}

/// Work the orchestrator asks its driver to carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAction {
    Connect(ServerDescriptor),
    Disconnect,
    Register,
    CreateChannel(String),
    JoinChannel(ChannelRef),
}

impl ServiceAction {
    pub fn name(&self) -> &'static str {
        match self {
            ServiceAction::Connect(_) => "CONNECT",
            ServiceAction::Disconnect => "DISCONNECT",
            ServiceAction::Register => "REGISTER",
            ServiceAction::CreateChannel(_) => "CREATE_CHANNEL",
            ServiceAction::JoinChannel(_) => "JOIN_CHANNEL",
        }
    }
}

/// Reconnect backoff policy, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub initial_backoff_secs: u32,
    /// Ceiling for the doubled backoff; `None` leaves it unbounded
    pub max_backoff_secs: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff_secs: 3,
            max_backoff_secs: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn with_max_backoff(mut self, max_backoff_secs: u32) -> Self {
        self.max_backoff_secs = Some(max_backoff_secs);
        self
    }

    /// Backoff after one more non-explicit disconnect
    pub fn next_backoff(&self, current: u32) -> u32 {
        let doubled = current.saturating_mul(2);
        match self.max_backoff_secs {
            Some(max) => doubled.min(max),
            None => doubled,
        }
    }

    /// Load the `reconnect` section; absent values keep their defaults
    pub fn load(file: Option<&Path>) -> SessionResult<Self> {
        Ok(talkbridge_infra_common::config::load_section("reconnect", file)?)
    }
}

/// Voice server coordinates shared by every attempt
#[derive(Clone, PartialEq, Eq)]
pub struct VoiceServerConfig {
    host: String,
    port: u16,
    password: String,
}

impl fmt::Debug for VoiceServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Raw voice server settings as read from file or environment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoiceServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub password: Option<String>,
}

impl VoiceServerConfig {
    pub fn builder() -> VoiceServerConfigBuilder {
        VoiceServerConfigBuilder::default()
    }

    /// Load the `voice` section from an optional TOML file and
    /// `TALKBRIDGE_VOICE__*` environment variables
    pub fn load(file: Option<&Path>) -> SessionResult<Self> {
        let settings: VoiceServerSettings =
            talkbridge_infra_common::config::load_section("voice", file)?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: VoiceServerSettings) -> SessionResult<Self> {
        let mut builder = Self::builder();
        if let Some(host) = settings.host {
            builder = builder.host(host);
        }
        if let Some(port) = settings.port {
            builder = builder.port(port);
        }
        if let Some(password) = settings.password {
            builder = builder.password(password);
        }
        builder.build()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Builder for [`VoiceServerConfig`]
#[derive(Debug, Clone, Default)]
pub struct VoiceServerConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    password: Option<String>,
}

impl VoiceServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Defaults to 64738
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn build(self) -> SessionResult<VoiceServerConfig> {
        let host = self
            .host
            .filter(|host| !host.trim().is_empty())
            .ok_or(SessionError::NotConfigured { field: "host" })?;
        let password = self
            .password
            .ok_or(SessionError::NotConfigured { field: "password" })?;
        let port = self.port.unwrap_or(DEFAULT_VOICE_PORT);
        if port == 0 {
            return Err(SessionError::config("port must not be 0"));
        }

        Ok(VoiceServerConfig {
            host,
            port,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn server() -> VoiceServerConfig {
        VoiceServerConfig::builder()
            .host("voice.example.net")
            .password("pw")
            .build()
            .unwrap()
    }

    #[test]
    fn ephemeral_username_shape() {
        for _ in 0..50 {
            let descriptor = ServerDescriptor::ephemeral(&server());
            let n: u32 = descriptor
                .username
                .strip_prefix(EPHEMERAL_USERNAME_PREFIX)
                .unwrap()
                .parse()
                .unwrap();
            assert!(n < 1000);
            assert_eq!(descriptor.port, DEFAULT_VOICE_PORT);
            assert_eq!(descriptor.identity, IdentitySlot::Ephemeral);
        }
    }

    #[test]
    fn descriptor_debug_hides_password() {
        let rendered = format!("{:?}", ServerDescriptor::ephemeral(&server()));
        assert!(!rendered.contains("\"pw\""));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn missing_password_is_not_configured() {
        let err = VoiceServerConfig::builder().host("h").build().unwrap_err();
        assert!(matches!(err, SessionError::NotConfigured { field: "password" }));
    }

    #[test]
    fn missing_host_is_not_configured() {
        let err = VoiceServerConfig::builder().password("p").build().unwrap_err();
        assert!(matches!(err, SessionError::NotConfigured { field: "host" }));
    }

    #[test]
    fn backoff_doubles_without_ceiling() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.next_backoff(3), 6);
        assert_eq!(policy.next_backoff(u32::MAX), u32::MAX);
    }

    #[test]
    fn backoff_respects_ceiling() {
        let policy = ReconnectPolicy::default().with_max_backoff(20);
        assert_eq!(policy.next_backoff(12), 20);
        assert_eq!(policy.next_backoff(20), 20);
    }

    #[test]
    fn terminal_causes() {
        assert!(DisconnectCause::PermissionDenied("x".into()).is_terminal());
        assert!(DisconnectCause::UntrustedCertificate(CertificateChain::default()).is_terminal());
        assert!(!DisconnectCause::ConnectionLost("x".into()).is_terminal());
        assert!(!DisconnectCause::Rejected {
            reason: RejectReason::ServerFull,
            message: String::new()
        }
        .is_terminal());
    }

    #[test]
    fn state_display() {
        let state = ServiceState::Disconnected {
            channel_name: "x".into(),
            reconnect: true,
            backoff: 6,
            cause: DisconnectCause::ConnectionLost("io".into()),
        };
        assert_eq!(state.to_string(), "DISCONNECTED(x, reconnect=true, backoff=6)");
        assert_eq!(state.reconnect_after(), Some(6));
    }

    #[test]
    #[serial]
    fn voice_config_from_environment() {
        // SAFETY: tests touching the environment are serialized.
        unsafe {
            std::env::set_var("TALKBRIDGE_VOICE__HOST", "voice.test");
            std::env::set_var("TALKBRIDGE_VOICE__PASSWORD", "secret");
            std::env::set_var("TALKBRIDGE_VOICE__PORT", "1234");
        }
        let config = VoiceServerConfig::load(None);
        unsafe {
            std::env::remove_var("TALKBRIDGE_VOICE__HOST");
            std::env::remove_var("TALKBRIDGE_VOICE__PASSWORD");
            std::env::remove_var("TALKBRIDGE_VOICE__PORT");
        }

        let config = config.unwrap();
        assert_eq!(config.host(), "voice.test");
        assert_eq!(config.port(), 1234);
        assert_eq!(config.password(), "secret");
    }

    #[test]
    #[serial]
    fn reconnect_policy_defaults_without_settings() {
        assert_eq!(ReconnectPolicy::load(None).unwrap(), ReconnectPolicy::default());
    }
}
