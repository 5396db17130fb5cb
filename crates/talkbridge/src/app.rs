use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use talkbridge_client_core::{CallClient, CallHandle, ClientConfig, ClientResult};
use talkbridge_infra_common::config::load_section;
use talkbridge_infra_common::{LoggingConfig, log_welcome, parse_log_level, setup_logging};
use talkbridge_session_core::{VoiceServerConfig, VoiceSessionProvider};
use talkbridge_signaling_core::{CallDispatch, CallRequest, SignalingConfig, SignalingRepository};

/// Raw `logging` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of `trace`, `debug`, `info`, `warn`, `error`
    pub level: Option<String>,
    /// Emit JSON lines
    pub json: bool,
    /// Include file and line in each record
    pub file_info: bool,
}

impl LoggingSettings {
    /// Validate into a [`LoggingConfig`]
    pub fn into_config(self) -> ClientResult<LoggingConfig> {
        let mut config = LoggingConfig::default();
        if let Some(level) = self.level {
            config.level = parse_log_level(&level)?;
        }
        if self.json {
            config = config.with_json();
        }
        if self.file_info {
            config = config.with_file_info();
        }
        Ok(config)
    }
}

/// Every section an application needs, loaded together
#[derive(Clone)]
pub struct TalkbridgeConfig {
    /// Subscriber settings
    pub logging: LoggingConfig,
    /// Signaling service endpoint and credentials
    pub signaling: SignalingConfig,
    /// Voice server coordinates
    pub voice: VoiceServerConfig,
    /// Call launch and reconnect settings
    pub client: ClientConfig,
}

impl TalkbridgeConfig {
    /// Load the `logging`, `signaling`, `voice`, `client` and `reconnect`
    /// sections from an optional TOML file and `TALKBRIDGE_*` variables
    pub fn load(file: Option<&Path>) -> ClientResult<Self> {
        let logging: LoggingSettings = load_section("logging", file)?;
        Ok(Self {
            logging: logging.into_config()?,
            signaling: SignalingConfig::load(file)?,
            voice: VoiceServerConfig::load(file)?,
            client: ClientConfig::load(file)?,
        })
    }
}

/// Signaling client and call launcher sharing one configuration
pub struct Talkbridge {
    signaling: SignalingRepository,
    client: CallClient,
}

impl Talkbridge {
    /// Build from an already loaded configuration. Logging is left alone.
    pub fn new(config: TalkbridgeConfig, provider: Arc<dyn VoiceSessionProvider>) -> ClientResult<Self> {
        let signaling = SignalingRepository::new(config.signaling)?;
        let client = CallClient::new(config.client, config.voice, provider)?;
        Ok(Self { signaling, client })
    }

    /// Load configuration, install the log subscriber and build.
    ///
    /// An already installed subscriber is kept.
    pub fn init(file: Option<&Path>, provider: Arc<dyn VoiceSessionProvider>) -> ClientResult<Self> {
        let config = TalkbridgeConfig::load(file)?;
        let app_name = config.logging.app_name.clone();
        if let Err(e) = setup_logging(config.logging.clone()) {
            debug!("Keeping existing log subscriber: {}", e);
        }
        log_welcome(&app_name, crate::VERSION);
        Self::new(config, provider)
    }

    /// Signaling API client
    pub fn signaling(&self) -> &SignalingRepository {
        &self.signaling
    }

    /// Call launcher
    pub fn client(&self) -> &CallClient {
        &self.client
    }

    /// Send a call offer to an organization user, then join the channel it
    /// names. The callee receives the same channel through the offer.
    pub async fn place_call(&self, request: CallRequest) -> ClientResult<(CallDispatch, CallHandle)> {
        let dispatch = self.signaling.make_call_to_organization(request).await?;
        info!("Call offer sent for channel {}", dispatch.mumble_info.channel_name);
        let call = self.client.launch_answer_with(&dispatch.mumble_info).await?;
        Ok((dispatch, call))
    }
}
