//! Call client configuration
//!
//! ```rust
//! use std::time::Duration;
//! use talkbridge_client_core::ClientConfig;
//!
//! let config = ClientConfig::new()
//!     .with_startup_delay(Duration::ZERO)
//!     .with_max_backoff(60);
//!
//! assert_eq!(config.reconnect.initial_backoff_secs, 3);
//! assert_eq!(config.reconnect.max_backoff_secs, Some(60));
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use talkbridge_session_core::ReconnectPolicy;

use crate::error::{ClientError, ClientResult};

/// Settings shared by every call launched from one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Wait before the first connect of a launched call
    pub startup_delay: Duration,
    /// Channel-name suffixes are drawn from `0..channel_suffix_range`
    pub channel_suffix_range: u32,
    /// Per-subscriber buffer of the action stream
    pub event_capacity: usize,
    /// How long `shutdown` waits for the driver's tasks
    pub shutdown_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(5),
            channel_suffix_range: 10,
            event_capacity: 64,
            shutdown_timeout: Duration::from_secs(5),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Raw `client` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientSettings {
    pub startup_delay_ms: Option<u64>,
    pub channel_suffix_range: Option<u32>,
    pub event_capacity: Option<usize>,
    pub shutdown_timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn with_channel_suffix_range(mut self, range: u32) -> Self {
        self.channel_suffix_range = range;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff_secs: u32) -> Self {
        self.reconnect = self.reconnect.with_max_backoff(max_backoff_secs);
        self
    }

    /// Load the `client` and `reconnect` sections from an optional TOML file
    /// and `TALKBRIDGE_*` environment variables
    pub fn load(file: Option<&Path>) -> ClientResult<Self> {
        let settings: ClientSettings = talkbridge_infra_common::config::load_section("client", file)?;
        let reconnect = ReconnectPolicy::load(file)?;

        let mut config = Self::default().with_reconnect_policy(reconnect);
        if let Some(ms) = settings.startup_delay_ms {
            config.startup_delay = Duration::from_millis(ms);
        }
        if let Some(range) = settings.channel_suffix_range {
            config.channel_suffix_range = range;
        }
        if let Some(capacity) = settings.event_capacity {
            config.event_capacity = capacity;
        }
        if let Some(ms) = settings.shutdown_timeout_ms {
            config.shutdown_timeout = Duration::from_millis(ms);
        }
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> ClientResult<()> {
        if self.channel_suffix_range == 0 {
            return Err(ClientError::config("channel_suffix_range must be at least 1"));
        }
        if self.event_capacity == 0 {
            return Err(ClientError::config("event_capacity must be at least 1"));
        }
        if self.reconnect.initial_backoff_secs == 0 {
            return Err(ClientError::config("initial_backoff_secs must be at least 1"));
        }
        if let Some(max) = self.reconnect.max_backoff_secs {
            if max < self.reconnect.initial_backoff_secs {
                return Err(ClientError::config(
                    "max_backoff_secs must not be below initial_backoff_secs",
                ));
            }
        }
        Ok(())
    }
}
