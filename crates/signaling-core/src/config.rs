//! Signaling configuration
//!
//! A [`SignalingConfig`] is built once at startup, either through
//! [`SignalingConfigBuilder`] or from layered settings with
//! [`SignalingConfig::load`], and handed to every component that talks to the
//! signaling service. Missing required values fail with
//! [`SignalingError::NotConfigured`].
//!
//! ```rust
//! use talkbridge_signaling_core::{SignalingConfig, SignalingEnvironment};
//!
//! let config = SignalingConfig::builder()
//!     .security_key("secret")
//!     .environment(SignalingEnvironment::Test)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.base_url().as_str(), "https://uat-api.1111job.app/");
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SignalingError, SignalingResult};

/// Production signaling endpoint
pub const PRODUCTION_BASE_URL: &str = "https://api.1111job.app/";
/// Test (UAT) signaling endpoint
pub const TEST_BASE_URL: &str = "https://uat-api.1111job.app/";

/// Which signaling deployment to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalingEnvironment {
    /// Live service
    Production,
    /// UAT service
    Test,
}

impl SignalingEnvironment {
    /// Base URL of this deployment
    pub fn base_url(&self) -> &'static str {
        match self {
            SignalingEnvironment::Production => PRODUCTION_BASE_URL,
            SignalingEnvironment::Test => TEST_BASE_URL,
        }
    }

    /// Whether this is the UAT deployment
    pub fn is_test(&self) -> bool {
        matches!(self, SignalingEnvironment::Test)
    }
}

/// Defaults stamped into every outgoing call offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOfferDefaults {
    /// Voice node the callee should connect to
    pub target_node: String,
    /// Avatar URL template; `{caller}` is replaced with the caller id
    pub avatar_url_template: String,
}

impl Default for CallOfferDefaults {
    fn default() -> Self {
        Self {
            target_node: "5345".to_string(),
            avatar_url_template: "https://picsum.photos/seed/{caller}/128/128".to_string(),
        }
    }
}

impl CallOfferDefaults {
    /// Avatar URL for the given caller id
    pub fn avatar_url(&self, caller: i64) -> String {
        self.avatar_url_template
            .replace("{caller}", &caller.to_string())
    }
}

/// Complete, validated signaling configuration
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    security_key: String,
    environment: SignalingEnvironment,
    base_url: Url,
    request_timeout: Duration,
    call_defaults: CallOfferDefaults,
}

impl SignalingConfig {
    /// Start building a configuration
    pub fn builder() -> SignalingConfigBuilder {
        SignalingConfigBuilder::default()
    }

    /// Load the `signaling` section from an optional TOML file and
    /// `TALKBRIDGE_SIGNALING__*` environment variables.
    pub fn load(file: Option<&Path>) -> SignalingResult<Self> {
        let settings: SignalingSettings =
            talkbridge_infra_common::config::load_section("signaling", file)?;
        Self::from_settings(settings)
    }

    /// Validate raw settings into a configuration
    pub fn from_settings(settings: SignalingSettings) -> SignalingResult<Self> {
        let mut builder = Self::builder();
        if let Some(key) = settings.security_key {
            builder = builder.security_key(key);
        }
        if let Some(environment) = settings.environment {
            builder = builder.environment(environment);
        }
        if let Some(base_url) = settings.base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(node) = settings.target_node {
            builder = builder.target_node(node);
        }
        if let Some(template) = settings.avatar_url_template {
            builder = builder.avatar_url_template(template);
        }
        builder.build()
    }

    /// Shared key sent with every request
    pub fn security_key(&self) -> &str {
        &self.security_key
    }

    /// Selected deployment
    pub fn environment(&self) -> SignalingEnvironment {
        self.environment
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Call offer defaults
    pub fn call_defaults(&self) -> &CallOfferDefaults {
        &self.call_defaults
    }
}

/// Raw, unvalidated settings as read from file or environment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalingSettings {
    pub security_key: Option<String>,
    pub environment: Option<SignalingEnvironment>,
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub target_node: Option<String>,
    pub avatar_url_template: Option<String>,
}

/// Builder for [`SignalingConfig`]
#[derive(Debug, Clone, Default)]
pub struct SignalingConfigBuilder {
    security_key: Option<String>,
    environment: Option<SignalingEnvironment>,
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    call_defaults: CallOfferDefaults,
}

impl SignalingConfigBuilder {
    /// Set the shared security key (required)
    pub fn security_key(mut self, key: impl Into<String>) -> Self {
        self.security_key = Some(key.into());
        self
    }

    /// Select the deployment (required)
    pub fn environment(mut self, environment: SignalingEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Override the deployment's base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the per-request timeout (default 10 seconds)
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the voice node advertised in call offers
    pub fn target_node(mut self, node: impl Into<String>) -> Self {
        self.call_defaults.target_node = node.into();
        self
    }

    /// Set the avatar URL template advertised in call offers
    pub fn avatar_url_template(mut self, template: impl Into<String>) -> Self {
        self.call_defaults.avatar_url_template = template.into();
        self
    }

    /// Validate and build
    pub fn build(self) -> SignalingResult<SignalingConfig> {
        let security_key = self
            .security_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(SignalingError::NotConfigured {
                field: "security_key",
            })?;

        let environment = self.environment.ok_or(SignalingError::NotConfigured {
            field: "environment",
        })?;

        let raw_url = self
            .base_url
            .unwrap_or_else(|| environment.base_url().to_string());
        let base_url = Url::parse(&raw_url)
            .map_err(|e| SignalingError::config(format!("invalid base URL '{}': {}", raw_url, e)))?;

        Ok(SignalingConfig {
            security_key,
            environment,
            base_url,
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(10)),
            call_defaults: self.call_defaults,
        })
    }
}
