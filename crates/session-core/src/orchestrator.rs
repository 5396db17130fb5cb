//! Call-session orchestrator
//!
//! Owns one call's [`CallSession`] and serializes every change to it.
//! Local operations (`connect`, `disconnect`, ...) and provider events
//! (`handle_event`) both go through the transition table; the resulting
//! state is published on a `watch` channel (latest value) and the actions on
//! a `broadcast` channel (multicast, no replay). Both are published while
//! the session lock is held, so every observer sees them in transition order.

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::error::SessionResult;
use crate::provider::{CertificateChain, ChannelRef, ConnectionError, VoiceEvent, VoiceUser};
use crate::state_table::{self, CallSession, Trigger};
use crate::types::{
    ReconnectPolicy, ServerDescriptor, ServiceAction, ServiceState, VoiceServerConfig,
};

/// Default capacity of the action broadcast channel
pub const DEFAULT_ACTION_CAPACITY: usize = 64;

/// State machine for one call
pub struct CallSessionOrchestrator {
    session: Mutex<CallSession>,
    policy: ReconnectPolicy,
    server: VoiceServerConfig,
    state_tx: watch::Sender<ServiceState>,
    action_tx: broadcast::Sender<ServiceAction>,
}

impl CallSessionOrchestrator {
    pub fn new(server: VoiceServerConfig, policy: ReconnectPolicy) -> Self {
        Self::with_capacity(server, policy, DEFAULT_ACTION_CAPACITY)
    }

    /// Orchestrator whose action channel buffers `capacity` actions per
    /// subscriber
    pub fn with_capacity(server: VoiceServerConfig, policy: ReconnectPolicy, capacity: usize) -> Self {
        let session = CallSession::new(&policy);
        let (state_tx, _) = watch::channel(session.state().clone());
        let (action_tx, _) = broadcast::channel(capacity.max(1));

        Self {
            session: Mutex::new(session),
            policy,
            server,
            state_tx,
            action_tx,
        }
    }

    /// Current state
    pub fn state(&self) -> ServiceState {
        self.session.lock().state().clone()
    }

    /// Current backoff in seconds
    pub fn backoff(&self) -> u32 {
        self.session.lock().backoff()
    }

    /// Our provider session id while connected
    pub fn local_session_id(&self) -> Option<u32> {
        self.session.lock().local_session()
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// State stream; a new receiver sees the current state immediately
    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.state_tx.subscribe()
    }

    /// Action stream; only actions emitted after subscribing are delivered
    pub fn subscribe_actions(&self) -> broadcast::Receiver<ServiceAction> {
        self.action_tx.subscribe()
    }

    /// Start a connection attempt for `channel_name` with a fresh ephemeral
    /// identity
    pub fn connect(&self, channel_name: impl Into<String>) -> SessionResult<()> {
        let channel_name = channel_name.into();
        info!("Connecting call session for channel '{}'", channel_name);
        self.apply(Trigger::Connect {
            channel_name,
            server: ServerDescriptor::ephemeral(&self.server),
        })
    }

    /// Retry the current channel; only valid in `DISCONNECTED(reconnect)`
    pub fn reconnect(&self) -> SessionResult<()> {
        self.apply(Trigger::Reconnect {
            server: ServerDescriptor::ephemeral(&self.server),
        })
    }

    /// Tear the session down; no reconnect follows
    pub fn disconnect(&self) -> SessionResult<()> {
        info!("Disconnect requested");
        self.apply(Trigger::Disconnect)
    }

    /// Ask for the local user to be registered
    pub fn register(&self) -> SessionResult<()> {
        self.apply(Trigger::Register)
    }

    /// Ask for the call channel to be created
    pub fn create_channel(&self, name: impl Into<String>) -> SessionResult<()> {
        self.apply(Trigger::CreateChannel { name: name.into() })
    }

    /// Feed one provider event. Events the state machine has no interest in
    /// are accepted and dropped.
    pub fn handle_event(&self, event: VoiceEvent) -> SessionResult<()> {
        let trigger = match event {
            VoiceEvent::Connected { session_id } => Trigger::Connected { session_id },
            VoiceEvent::Disconnected { error } => Trigger::Disconnected { error },
            VoiceEvent::TlsHandshakeFailed { chain } => Trigger::TlsHandshakeFailed { chain },
            VoiceEvent::ChannelAdded { channel } => Trigger::ChannelAdded { channel },
            VoiceEvent::UserJoinedChannel { user, channel, .. } => {
                Trigger::UserJoinedChannel { user, channel }
            }
            VoiceEvent::PermissionDenied { reason } => Trigger::PermissionDenied { reason },
            other => {
                debug!("Ignoring provider event {}", other.name());
                return Ok(());
            }
        };
        self.apply(trigger)
    }

    pub fn on_connected(&self, session_id: u32) -> SessionResult<()> {
        self.handle_event(VoiceEvent::Connected { session_id })
    }

    pub fn on_disconnected(&self, error: Option<ConnectionError>) -> SessionResult<()> {
        self.handle_event(VoiceEvent::Disconnected { error })
    }

    pub fn on_channel_added(&self, channel: ChannelRef) -> SessionResult<()> {
        self.handle_event(VoiceEvent::ChannelAdded { channel })
    }

    pub fn on_user_joined_channel(
        &self,
        user: VoiceUser,
        channel: ChannelRef,
        previous: Option<ChannelRef>,
    ) -> SessionResult<()> {
        self.handle_event(VoiceEvent::UserJoinedChannel {
            user,
            channel,
            previous,
        })
    }

    pub fn on_permission_denied(&self, reason: impl Into<String>) -> SessionResult<()> {
        self.handle_event(VoiceEvent::PermissionDenied {
            reason: reason.into(),
        })
    }

    pub fn on_tls_handshake_failed(&self, chain: CertificateChain) -> SessionResult<()> {
        self.handle_event(VoiceEvent::TlsHandshakeFailed { chain })
    }

    fn apply(&self, trigger: Trigger) -> SessionResult<()> {
        let mut session = self.session.lock();
        let trigger_name = trigger.name();

        let transition = match state_table::transition(&session, trigger, &self.policy) {
            Ok(transition) => transition,
            Err(e) => {
                warn!("Rejected {} in {}: {}", trigger_name, session.state(), e);
                return Err(e);
            }
        };

        if let Some(reason) = transition.ignored {
            debug!("{} in {} ignored: {}", trigger_name, session.state(), reason);
        }

        let changed = transition.session.state() != session.state();
        if changed {
            debug!("{} --{}--> {}", session.state(), trigger_name, transition.session.state());
        }
        *session = transition.session;

        if changed {
            if let ServiceState::Disconnected { cause, .. } = session.state() {
                if cause.is_terminal() {
                    error!("Call session stopped: {:?}", cause);
                }
            }
            if session.state().is_joined() {
                info!("Joined channel '{}'", session.state().channel_name());
            }
            self.state_tx.send_replace(session.state().clone());
        }

        for action in transition.actions {
            debug!("Emitting {}", action.name());
            // No subscriber is fine; actions are fire-and-forget.
            let _ = self.action_tx.send(action);
        }

        Ok(())
    }
}

impl std::fmt::Debug for CallSessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSessionOrchestrator")
            .field("state", &self.state())
            .field("policy", &self.policy)
            .field("server", &self.server)
            .finish()
    }
}
