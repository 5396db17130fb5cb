//! Transition table for a call session
//!
//! [`transition`] is a pure function from the current [`CallSession`] and a
//! [`Trigger`] to the next session plus the actions to emit. It performs no
//! I/O and never touches channels; the orchestrator applies the result under
//! its lock. Pairs without a row fail with
//! [`SessionError::InvalidTransition`] (provider events) or
//! [`SessionError::InvalidState`] (local operations) and leave the session
//! untouched.
//!
//! | From | Trigger | To | Emits |
//! |---|---|---|---|
//! | DISCONNECTED | connect | CONNECTING | CONNECT |
//! | DISCONNECTED(reconnect) | reconnect | CONNECTING | CONNECT |
//! | CONNECTING | connected | CONNECTED | |
//! | CONNECTING/CONNECTED/JOINED | disconnected | DISCONNECTED(reconnect, backoff x2) | |
//! | CONNECTING/CONNECTED/JOINED | disconnected(auth reject) | DISCONNECTED(no reconnect) | |
//! | CONNECTING | tls failure | DISCONNECTED(no reconnect) | |
//! | CONNECTED | register | CONNECTED(registered) | REGISTER |
//! | CONNECTED | create channel | CONNECTED | CREATE_CHANNEL |
//! | CONNECTED | channel added (pending) | CONNECTED | JOIN_CHANNEL |
//! | CONNECTED/JOINED | self joined channel | JOINED | |
//! | CONNECTING/CONNECTED/JOINED | permission denied | DISCONNECTING | DISCONNECT |
//! | any | disconnect | DISCONNECTING | DISCONNECT |
//! | DISCONNECTING | disconnected | DISCONNECTED(no reconnect) | |

use crate::error::{SessionError, SessionResult};
use crate::provider::{CertificateChain, ChannelRef, ConnectionError, VoiceUser};
use crate::types::{DisconnectCause, ReconnectPolicy, ServerDescriptor, ServiceAction, ServiceState};

/// Input to the transition table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Connect {
        channel_name: String,
        server: ServerDescriptor,
    },
    Reconnect {
        server: ServerDescriptor,
    },
    Disconnect,
    Register,
    CreateChannel {
        name: String,
    },
    Connected {
        session_id: u32,
    },
    Disconnected {
        error: Option<ConnectionError>,
    },
    ChannelAdded {
        channel: ChannelRef,
    },
    UserJoinedChannel {
        user: VoiceUser,
        channel: ChannelRef,
    },
    PermissionDenied {
        reason: String,
    },
    TlsHandshakeFailed {
        chain: CertificateChain,
    },
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::Connect { .. } => "connect",
            Trigger::Reconnect { .. } => "reconnect",
            Trigger::Disconnect => "disconnect",
            Trigger::Register => "register",
            Trigger::CreateChannel { .. } => "create_channel",
            Trigger::Connected { .. } => "onConnected",
            Trigger::Disconnected { .. } => "onDisconnected",
            Trigger::ChannelAdded { .. } => "onChannelAdded",
            Trigger::UserJoinedChannel { .. } => "onUserJoinedChannel",
            Trigger::PermissionDenied { .. } => "onPermissionDenied",
            Trigger::TlsHandshakeFailed { .. } => "onTLSHandshakeFailed",
        }
    }
}

/// Everything the orchestrator tracks for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSession {
    state: ServiceState,
    backoff: u32,
    /// Name passed to the last CREATE_CHANNEL of this CONNECTED entry
    pending_channel: Option<String>,
    channel_requested: bool,
    join_requested: bool,
    local_session: Option<u32>,
    reached_joined: bool,
    /// Cause to report when the current teardown completes
    pending_failure: Option<DisconnectCause>,
}

impl CallSession {
    pub fn new(policy: &ReconnectPolicy) -> Self {
        Self {
            state: ServiceState::Disconnected {
                channel_name: String::new(),
                reconnect: false,
                backoff: policy.initial_backoff_secs,
                cause: DisconnectCause::Idle,
            },
            backoff: policy.initial_backoff_secs,
            pending_channel: None,
            channel_requested: false,
            join_requested: false,
            local_session: None,
            reached_joined: false,
            pending_failure: None,
        }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn backoff(&self) -> u32 {
        self.backoff
    }

    /// Our provider session id during the current connection
    pub fn local_session(&self) -> Option<u32> {
        self.local_session
    }

    /// Whether JOINED was reached since the backoff was last reset
    pub fn has_joined(&self) -> bool {
        self.reached_joined
    }

    fn enter_connecting(mut self, channel_name: String, server: ServerDescriptor, policy: &ReconnectPolicy) -> Transition {
        if let ServiceState::Disconnected {
            reconnect: false,
            cause: DisconnectCause::Requested,
            ..
        } = self.state
        {
            if self.reached_joined {
                self.backoff = policy.initial_backoff_secs;
                self.reached_joined = false;
            }
        }

        self.state = ServiceState::Connecting {
            channel_name,
            backoff: self.backoff,
        };
        self.pending_channel = None;
        self.channel_requested = false;
        self.join_requested = false;
        self.local_session = None;
        self.pending_failure = None;

        Transition::emit(self, ServiceAction::Connect(server))
    }

    fn enter_disconnected(mut self, reconnect: bool, cause: DisconnectCause) -> Transition {
        self.state = ServiceState::Disconnected {
            channel_name: self.state.channel_name().to_string(),
            reconnect,
            backoff: self.backoff,
            cause,
        };
        self.local_session = None;
        Transition::quiet(self)
    }

    fn enter_disconnecting(mut self) -> Transition {
        self.state = ServiceState::Disconnecting {
            channel_name: self.state.channel_name().to_string(),
            backoff: self.backoff,
        };
        Transition::emit(self, ServiceAction::Disconnect)
    }

    fn connection_lost(mut self, error: Option<ConnectionError>, policy: &ReconnectPolicy) -> Transition {
        let cause = match error {
            Some(ConnectionError::Rejected { reason, message }) => {
                let cause = DisconnectCause::Rejected { reason, message };
                if reason.is_authentication_failure() {
                    return self.enter_disconnected(false, cause);
                }
                cause
            }
            Some(ConnectionError::Transport(message)) => DisconnectCause::ConnectionLost(message),
            None => DisconnectCause::ConnectionLost("connection closed".to_string()),
        };

        self.backoff = policy.next_backoff(self.backoff);
        self.enter_disconnected(true, cause)
    }
}

/// Result of one table lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: CallSession,
    pub actions: Vec<ServiceAction>,
    /// Set when the trigger was accepted but deliberately had no effect
    pub ignored: Option<&'static str>,
}

impl Transition {
    fn quiet(session: CallSession) -> Self {
        Self {
            session,
            actions: Vec::new(),
            ignored: None,
        }
    }

    fn emit(session: CallSession, action: ServiceAction) -> Self {
        Self {
            session,
            actions: vec![action],
            ignored: None,
        }
    }

    fn ignore(session: CallSession, reason: &'static str) -> Self {
        Self {
            session,
            actions: Vec::new(),
            ignored: Some(reason),
        }
    }
}

/// Look up and compute the transition for `trigger` in `current`
pub fn transition(current: &CallSession, trigger: Trigger, policy: &ReconnectPolicy) -> SessionResult<Transition> {
    let state = current.state.name();
    let trigger_name = trigger.name();
    let next = current.clone();

    let transition = match (&current.state, trigger) {
        (ServiceState::Disconnected { .. }, Trigger::Connect { channel_name, server }) => {
            next.enter_connecting(channel_name, server, policy)
        }
        (_, Trigger::Connect { .. }) => {
            return Err(SessionError::InvalidState {
                operation: "connect",
                state,
            });
        }

        (
            ServiceState::Disconnected {
                reconnect: true,
                channel_name,
                ..
            },
            Trigger::Reconnect { server },
        ) => next.enter_connecting(channel_name.clone(), server, policy),
        (_, Trigger::Reconnect { .. }) => {
            return Err(SessionError::ReconnectSuppressed { state });
        }

        (_, Trigger::Disconnect) => next.enter_disconnecting(),

        (
            ServiceState::Connected {
                channel_name,
                registered: false,
            },
            Trigger::Register,
        ) => {
            let mut next = next;
            next.state = ServiceState::Connected {
                channel_name: channel_name.clone(),
                registered: true,
            };
            Transition::emit(next, ServiceAction::Register)
        }
        (ServiceState::Connected { registered: true, .. }, Trigger::Register) => {
            Transition::ignore(next, "already registered")
        }
        (_, Trigger::Register) => {
            return Err(SessionError::InvalidState {
                operation: "register",
                state,
            });
        }

        (ServiceState::Connected { .. }, Trigger::CreateChannel { name }) => {
            if current.channel_requested {
                Transition::ignore(next, "channel already requested")
            } else {
                let mut next = next;
                next.channel_requested = true;
                next.pending_channel = Some(name.clone());
                Transition::emit(next, ServiceAction::CreateChannel(name))
            }
        }
        (_, Trigger::CreateChannel { .. }) => {
            return Err(SessionError::InvalidState {
                operation: "create_channel",
                state,
            });
        }

        (ServiceState::Connecting { channel_name, .. }, Trigger::Connected { session_id }) => {
            let mut next = next;
            next.state = ServiceState::Connected {
                channel_name: channel_name.clone(),
                registered: false,
            };
            next.local_session = Some(session_id);
            next.pending_channel = None;
            next.channel_requested = false;
            next.join_requested = false;
            Transition::quiet(next)
        }

        (
            ServiceState::Connecting { .. } | ServiceState::Connected { .. } | ServiceState::Joined { .. },
            Trigger::Disconnected { error },
        ) => next.connection_lost(error, policy),
        (ServiceState::Disconnecting { .. }, Trigger::Disconnected { .. }) => {
            let mut next = next;
            let cause = next.pending_failure.take().unwrap_or(DisconnectCause::Requested);
            next.enter_disconnected(false, cause)
        }

        (ServiceState::Connected { channel_name, .. }, Trigger::ChannelAdded { channel }) => {
            let pending = current.pending_channel.as_deref().unwrap_or(channel_name);
            if channel.name != pending {
                Transition::ignore(next, "not the pending channel")
            } else if current.join_requested {
                Transition::ignore(next, "join already requested")
            } else {
                let mut next = next;
                next.join_requested = true;
                Transition::emit(next, ServiceAction::JoinChannel(channel))
            }
        }

        (
            ServiceState::Connected { .. } | ServiceState::Joined { .. },
            Trigger::UserJoinedChannel { user, channel },
        ) => {
            if current.local_session != Some(user.session_id) {
                Transition::ignore(next, "another user")
            } else {
                let mut next = next;
                next.state = ServiceState::Joined {
                    channel_name: channel.name,
                };
                next.reached_joined = true;
                Transition::quiet(next)
            }
        }

        (
            ServiceState::Connecting { .. } | ServiceState::Connected { .. } | ServiceState::Joined { .. },
            Trigger::PermissionDenied { reason },
        ) => {
            let mut next = next;
            next.pending_failure = Some(DisconnectCause::PermissionDenied(reason));
            next.enter_disconnecting()
        }

        (ServiceState::Connecting { .. }, Trigger::TlsHandshakeFailed { chain }) => {
            next.enter_disconnected(false, DisconnectCause::UntrustedCertificate(chain))
        }

        // The connect outlived its hang-up; tear the late connection down.
        (
            ServiceState::Disconnected {
                reconnect: false,
                cause: DisconnectCause::Requested,
                ..
            },
            Trigger::Connected { .. },
        ) => next.enter_disconnecting(),

        _ => {
            return Err(SessionError::InvalidTransition {
                state,
                trigger: trigger_name,
            });
        }
    };

    Ok(transition)
}
