//! Call entry points
//!
//! [`CallClient`] launches calls: it derives the channel name, builds a
//! fresh orchestrator and driver, waits the startup delay, connects, and
//! hands back a [`CallHandle`] that owns everything for that call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tracing::{debug, info, warn};

use talkbridge_session_core::{
    CallSessionOrchestrator, ServiceAction, ServiceState, VoiceServerConfig, VoiceSessionProvider,
};
use talkbridge_signaling_core::MumbleInfo;

use crate::channel::channel_name_for;
use crate::config::ClientConfig;
use crate::driver::CallDriver;
use crate::error::{ClientError, ClientResult};

/// Who is calling whom about what, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub caller: String,
    pub callee: String,
    pub job_title: String,
}

/// Launches calls against one voice server
pub struct CallClient {
    config: ClientConfig,
    server: VoiceServerConfig,
    provider: Arc<dyn VoiceSessionProvider>,
}

impl CallClient {
    pub fn new(
        config: ClientConfig,
        server: VoiceServerConfig,
        provider: Arc<dyn VoiceSessionProvider>,
    ) -> ClientResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            server,
            provider,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Place a call to an organization. The channel is the organization
    /// identifier, sanitized, plus one random digit.
    pub async fn launch_call(&self, caller: &str, callee_organization: &str, job_title: &str) -> ClientResult<CallHandle> {
        let channel_name = channel_name_for(callee_organization, self.config.channel_suffix_range);
        info!("Launching call from {} to {} about '{}'", caller, callee_organization, job_title);
        let target = CallTarget {
            caller: caller.to_string(),
            callee: callee_organization.to_string(),
            job_title: job_title.to_string(),
        };
        self.launch(channel_name, Some(target)).await
    }

    /// Answer side with no offer at hand
    pub async fn launch_answer(&self) -> ClientResult<CallHandle> {
        let channel_name = channel_name_for("", self.config.channel_suffix_range);
        info!("Launching answer");
        self.launch(channel_name, None).await
    }

    /// Answer a received offer by joining the channel it names
    pub async fn launch_answer_with(&self, offer: &MumbleInfo) -> ClientResult<CallHandle> {
        if offer.channel_name.trim().is_empty() {
            return Err(ClientError::config("call offer carries no channel name"));
        }
        info!("Answering call from '{}'", offer.caller_name);
        self.launch(offer.channel_name.clone(), None).await
    }

    async fn launch(&self, channel_name: String, target: Option<CallTarget>) -> ClientResult<CallHandle> {
        let orchestrator = Arc::new(CallSessionOrchestrator::with_capacity(
            self.server.clone(),
            self.config.reconnect,
            self.config.event_capacity,
        ));
        let driver = CallDriver::start(
            orchestrator,
            self.provider.clone(),
            self.config.shutdown_timeout,
        )
        .await?;

        if !self.config.startup_delay.is_zero() {
            debug!("Waiting {:?} before connecting", self.config.startup_delay);
            tokio::time::sleep(self.config.startup_delay).await;
        }
        driver.connect(channel_name.clone())?;

        Ok(CallHandle {
            driver,
            channel_name,
            target,
            shutdown_timeout: self.config.shutdown_timeout,
        })
    }
}

/// One running call
#[derive(Debug)]
pub struct CallHandle {
    driver: CallDriver,
    channel_name: String,
    target: Option<CallTarget>,
    shutdown_timeout: Duration,
}

impl CallHandle {
    /// Channel this call was launched for
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn target(&self) -> Option<&CallTarget> {
        self.target.as_ref()
    }

    pub fn state(&self) -> ServiceState {
        self.driver.orchestrator().state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.driver.orchestrator().subscribe_state()
    }

    pub fn subscribe_actions(&self) -> broadcast::Receiver<ServiceAction> {
        self.driver.orchestrator().subscribe_actions()
    }

    /// Every state from the current one on; intermediate states may be
    /// skipped when several happen between polls
    pub fn state_stream(&self) -> WatchStream<ServiceState> {
        WatchStream::new(self.subscribe_state())
    }

    /// Actions emitted from now on. A slow reader sees a lag error.
    pub fn action_stream(&self) -> BroadcastStream<ServiceAction> {
        BroadcastStream::new(self.subscribe_actions())
    }

    pub fn orchestrator(&self) -> &Arc<CallSessionOrchestrator> {
        self.driver.orchestrator()
    }

    /// Wait until the state satisfies `predicate` and return it
    pub async fn wait_for_state<F>(&self, mut predicate: F) -> ServiceState
    where
        F: FnMut(&ServiceState) -> bool,
    {
        let mut states = self.subscribe_state();
        loop {
            {
                let current = states.borrow_and_update();
                if predicate(&*current) {
                    return current.clone();
                }
            }
            if states.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Connect again on this call's channel right away, superseding any
    /// pending reconnect wait
    pub fn redial(&self) -> ClientResult<()> {
        info!("Redialing call on '{}'", self.channel_name);
        self.driver.connect(self.channel_name.clone())
    }

    /// End the call; no reconnect follows
    pub fn hang_up(&self) -> ClientResult<()> {
        info!("Hanging up call on '{}'", self.channel_name);
        self.driver.disconnect()
    }

    /// Hang up if needed, wait for the disconnect to settle, then stop every
    /// task of this call
    pub async fn shutdown(self) {
        let settled = |state: &ServiceState| state.is_disconnected() && state.reconnect_after().is_none();
        if !settled(&self.state()) {
            if let Err(e) = self.hang_up() {
                debug!("Hang up during shutdown: {}", e);
            }
            let waited = tokio::time::timeout(self.shutdown_timeout, self.wait_for_state(settled)).await;
            if waited.is_err() {
                warn!("Call on '{}' did not settle before shutdown", self.channel_name);
            }
        }
        self.driver.shutdown().await;
    }

    /// Number of driver tasks still running
    pub fn active_tasks(&self) -> usize {
        self.driver.active_tasks()
    }
}
