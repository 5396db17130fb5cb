//! Orchestration driver
//!
//! The orchestrator decides, the driver acts. A [`CallDriver`] runs three
//! tasks inside one [`TaskScope`]:
//!
//! ```text
//!   orchestrator --actions--> [action loop] --calls--> provider
//!   provider ----events----> [event pump] --handle_event--> orchestrator
//!   orchestrator --state---> [state loop] --create_channel / reconnect--> orchestrator
//! ```
//!
//! The state loop owns the reconnect wait. It sleeps for the backoff
//! carried by `DISCONNECTED(reconnect)` unless [`CallDriver::disconnect`] or
//! [`CallDriver::connect`] cancels the wait first, or the state moves on.
//! A wait that loses the race still cannot connect because the orchestrator
//! only accepts `reconnect()` while it asks for one.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use talkbridge_infra_common::TaskScope;
use talkbridge_session_core::{
    resolve_parent_channel, CallSessionOrchestrator, ChannelRequest, ConnectionError,
    ProviderError, ServiceAction, ServiceState, SessionError, VoiceEvent, VoiceSessionProvider,
};

use crate::error::ClientResult;

/// Runs one call session against a provider
pub struct CallDriver {
    orchestrator: Arc<CallSessionOrchestrator>,
    provider: Arc<dyn VoiceSessionProvider>,
    scope: TaskScope,
    reconnect_token: Arc<Mutex<CancellationToken>>,
}

impl CallDriver {
    /// Subscribe to both sides and start the driver tasks.
    ///
    /// Subscriptions are taken before this returns, so nothing emitted
    /// afterwards is missed.
    pub async fn start(
        orchestrator: Arc<CallSessionOrchestrator>,
        provider: Arc<dyn VoiceSessionProvider>,
        shutdown_timeout: Duration,
    ) -> ClientResult<Self> {
        let scope = TaskScope::with_shutdown_timeout("call-driver", shutdown_timeout);
        let reconnect_token = Arc::new(Mutex::new(scope.child_token()));

        let actions = orchestrator.subscribe_actions();
        let events = provider.subscribe();
        let states = orchestrator.subscribe_state();

        scope
            .spawn(
                "action-loop",
                action_loop(orchestrator.clone(), provider.clone(), actions),
            )
            .await?;
        scope
            .spawn("event-pump", event_pump(orchestrator.clone(), events))
            .await?;
        scope
            .spawn(
                "state-loop",
                state_loop(orchestrator.clone(), states, reconnect_token.clone()),
            )
            .await?;

        info!("Call driver started");
        Ok(Self {
            orchestrator,
            provider,
            scope,
            reconnect_token,
        })
    }

    pub fn orchestrator(&self) -> &Arc<CallSessionOrchestrator> {
        &self.orchestrator
    }

    pub fn provider(&self) -> &Arc<dyn VoiceSessionProvider> {
        &self.provider
    }

    /// Begin the session on `channel_name`; supersedes any pending
    /// reconnect wait
    pub fn connect(&self, channel_name: impl Into<String>) -> ClientResult<()> {
        self.cancel_reconnect_wait();
        Ok(self.orchestrator.connect(channel_name)?)
    }

    /// End the session; cancels any pending reconnect wait first
    pub fn disconnect(&self) -> ClientResult<()> {
        self.cancel_reconnect_wait();
        Ok(self.orchestrator.disconnect()?)
    }

    fn cancel_reconnect_wait(&self) {
        let mut token = self.reconnect_token.lock();
        token.cancel();
        *token = self.scope.child_token();
    }

    /// Number of driver tasks still running
    pub fn active_tasks(&self) -> usize {
        self.scope.active_task_count()
    }

    /// Stop the driver tasks and wait for them
    pub async fn shutdown(&self) {
        self.scope.shutdown().await;
        info!("Call driver stopped");
    }
}

impl std::fmt::Debug for CallDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallDriver")
            .field("orchestrator", &self.orchestrator)
            .field("scope", &self.scope.name())
            .finish()
    }
}

fn connection_error(err: ProviderError) -> ConnectionError {
    match err {
        ProviderError::Rejected { reason, message } => ConnectionError::Rejected { reason, message },
        other => ConnectionError::Transport(other.to_string()),
    }
}

fn report(result: Result<(), SessionError>, context: &str) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_state_rejection() => debug!("{}: {}", context, e),
        Err(e) => warn!("{}: {}", context, e),
    }
}

async fn action_loop(
    orchestrator: Arc<CallSessionOrchestrator>,
    provider: Arc<dyn VoiceSessionProvider>,
    mut actions: broadcast::Receiver<ServiceAction>,
) {
    loop {
        let action = match actions.recv().await {
            Ok(action) => action,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Action loop lagged, skipped {} actions", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        debug!("Executing {}", action.name());
        match action {
            ServiceAction::Connect(server) => {
                info!("Connecting to {}:{} as {}", server.host, server.port, server.username);
                if let Err(e) = provider.connect(server).await {
                    warn!("Connect failed: {}", e);
                    report(
                        orchestrator.on_disconnected(Some(connection_error(e))),
                        "connect failure",
                    );
                }
            }
            ServiceAction::Disconnect => {
                if let Err(e) = provider.disconnect().await {
                    // Nothing to tear down, so no Disconnected event will come.
                    debug!("Provider disconnect: {}", e);
                    report(orchestrator.on_disconnected(None), "local disconnect");
                }
            }
            ServiceAction::Register => match provider.session_id() {
                Some(session_id) => {
                    if let Err(e) = provider.register_user(session_id).await {
                        warn!("Registering session {} failed: {}", session_id, e);
                    }
                }
                None => warn!("Register requested without a provider session"),
            },
            ServiceAction::CreateChannel(name) => {
                let parent = resolve_parent_channel(provider.session_channel().as_ref());
                debug!("Creating channel '{}' under {}", name, parent);
                match provider
                    .create_channel(ChannelRequest::call_channel(parent, name.clone()))
                    .await
                {
                    Ok(id) => debug!("Channel '{}' created with id {}", name, id),
                    Err(e) => error!("Creating channel '{}' failed: {}", name, e),
                }
            }
            ServiceAction::JoinChannel(channel) => {
                if let Err(e) = provider.join_channel(channel.id).await {
                    error!("Joining channel {} failed: {}", channel.id, e);
                }
            }
        }
    }
    debug!("Action loop finished");
}

async fn event_pump(
    orchestrator: Arc<CallSessionOrchestrator>,
    mut events: broadcast::Receiver<VoiceEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let name = event.name();
                report(orchestrator.handle_event(event), name);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event pump lagged, skipped {} provider events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Event pump finished");
}

async fn state_loop(
    orchestrator: Arc<CallSessionOrchestrator>,
    mut states: watch::Receiver<ServiceState>,
    reconnect_token: Arc<Mutex<CancellationToken>>,
) {
    // Set when a reconnect wait was cut short by a newer state
    let mut superseded: Option<ServiceState> = None;

    'states: loop {
        let state = match superseded.take() {
            Some(state) => state,
            None => {
                if states.changed().await.is_err() {
                    break;
                }
                states.borrow_and_update().clone()
            }
        };

        match state {
            ServiceState::Connected {
                channel_name,
                registered: false,
            } => {
                report(orchestrator.create_channel(channel_name), "create channel");
            }
            ServiceState::Disconnected {
                reconnect: true,
                backoff,
                cause,
                ..
            } => {
                let token = reconnect_token.lock().clone();
                info!("Connection lost ({:?}), reconnecting in {}s", cause, backoff);
                let wait = tokio::time::sleep(Duration::from_secs(u64::from(backoff)));
                tokio::pin!(wait);

                tokio::select! {
                    _ = &mut wait => {
                        report(orchestrator.reconnect(), "reconnect");
                    }
                    _ = token.cancelled() => {
                        debug!("Reconnect wait cancelled");
                    }
                    changed = states.changed() => {
                        if changed.is_err() {
                            break 'states;
                        }
                        let next = states.borrow_and_update().clone();
                        debug!("Reconnect wait superseded by {}", next);
                        superseded = Some(next);
                    }
                }
            }
            ServiceState::Disconnected { cause, .. } if cause.is_terminal() => {
                warn!("Not reconnecting: {:?}", cause);
            }
            _ => {}
        }
    }
    debug!("State loop finished");
}
