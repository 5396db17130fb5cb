//! Call-session lifecycle through the public orchestrator API

use pretty_assertions::assert_eq;
use tokio::sync::broadcast;

use talkbridge_session_core::{
    CertificateChain, ChannelRef, ConnectionError, DisconnectCause, ReconnectPolicy, ServiceAction,
    ServiceState, SessionError, CallSessionOrchestrator, VoiceEvent, VoiceServerConfig, VoiceUser,
};

const SELF_SESSION: u32 = 42;

fn orchestrator(policy: ReconnectPolicy) -> CallSessionOrchestrator {
    let server = VoiceServerConfig::builder()
        .host("voice.test")
        .password("pw")
        .build()
        .unwrap();
    CallSessionOrchestrator::new(server, policy)
}

fn me() -> VoiceUser {
    VoiceUser {
        session_id: SELF_SESSION,
        name: "UserR_7".into(),
    }
}

fn drain(actions: &mut broadcast::Receiver<ServiceAction>) -> Vec<ServiceAction> {
    let mut out = Vec::new();
    while let Ok(action) = actions.try_recv() {
        out.push(action);
    }
    out
}

fn names(actions: &[ServiceAction]) -> Vec<&'static str> {
    actions.iter().map(ServiceAction::name).collect()
}

fn transport_loss() -> Option<ConnectionError> {
    Some(ConnectionError::Transport("reset by peer".into()))
}

fn join(orch: &CallSessionOrchestrator, name: &str) {
    orch.connect(name).unwrap();
    orch.on_connected(SELF_SESSION).unwrap();
    orch.create_channel(name).unwrap();
    orch.on_channel_added(ChannelRef::new(7, name)).unwrap();
    orch.on_user_joined_channel(me(), ChannelRef::new(7, name), None).unwrap();
}

#[test]
fn happy_path_reaches_joined() {
    let orch = orchestrator(ReconnectPolicy::default());
    let mut actions = orch.subscribe_actions();

    orch.connect("jobA1").unwrap();
    orch.on_connected(SELF_SESSION).unwrap();
    assert_eq!(
        orch.state(),
        ServiceState::Connected {
            channel_name: "jobA1".into(),
            registered: false
        }
    );

    orch.create_channel("jobA1").unwrap();
    orch.on_channel_added(ChannelRef::new(7, "jobA1")).unwrap();
    orch.on_user_joined_channel(me(), ChannelRef::new(7, "jobA1"), Some(ChannelRef::new(0, "Root")))
        .unwrap();

    assert_eq!(
        orch.state(),
        ServiceState::Joined {
            channel_name: "jobA1".into()
        }
    );

    let emitted = drain(&mut actions);
    assert_eq!(names(&emitted), vec!["CONNECT", "CREATE_CHANNEL", "JOIN_CHANNEL"]);
    assert_eq!(emitted[2], ServiceAction::JoinChannel(ChannelRef::new(7, "jobA1")));
}

#[test]
fn transport_loss_while_connecting_doubles_backoff() {
    let orch = orchestrator(ReconnectPolicy::default());
    orch.connect("x").unwrap();
    assert_eq!(
        orch.state(),
        ServiceState::Connecting {
            channel_name: "x".into(),
            backoff: 3
        }
    );

    orch.on_disconnected(transport_loss()).unwrap();
    assert_eq!(
        orch.state(),
        ServiceState::Disconnected {
            channel_name: "x".into(),
            reconnect: true,
            backoff: 6,
            cause: DisconnectCause::ConnectionLost("reset by peer".into())
        }
    );
}

#[test]
fn backoff_doubles_each_cycle() {
    let orch = orchestrator(ReconnectPolicy::default());
    orch.connect("x").unwrap();

    let mut seen = vec![orch.backoff()];
    for _ in 0..4 {
        orch.on_disconnected(transport_loss()).unwrap();
        orch.reconnect().unwrap();
        match orch.state() {
            ServiceState::Connecting { backoff, .. } => seen.push(backoff),
            other => panic!("expected CONNECTING, got {}", other),
        }
    }
    assert_eq!(seen, vec![3, 6, 12, 24, 48]);
}

#[test]
fn backoff_ceiling_saturates() {
    let orch = orchestrator(ReconnectPolicy::default().with_max_backoff(20));
    orch.connect("x").unwrap();

    let mut seen = vec![orch.backoff()];
    for _ in 0..4 {
        orch.on_disconnected(None).unwrap();
        orch.reconnect().unwrap();
        seen.push(orch.backoff());
    }
    assert_eq!(seen, vec![3, 6, 12, 20, 20]);
}

#[test]
fn loss_after_join_also_doubles() {
    let orch = orchestrator(ReconnectPolicy::default());
    join(&orch, "x");
    orch.on_disconnected(transport_loss()).unwrap();
    assert_eq!(orch.state().reconnect_after(), Some(6));
}

#[test]
fn explicit_disconnect_from_joined() {
    let orch = orchestrator(ReconnectPolicy::default());
    join(&orch, "x");
    let mut actions = orch.subscribe_actions();

    orch.disconnect().unwrap();
    assert_eq!(
        orch.state(),
        ServiceState::Disconnecting {
            channel_name: "x".into(),
            backoff: 3
        }
    );
    assert_eq!(drain(&mut actions), vec![ServiceAction::Disconnect]);

    orch.on_disconnected(transport_loss()).unwrap();
    assert_eq!(
        orch.state(),
        ServiceState::Disconnected {
            channel_name: "x".into(),
            reconnect: false,
            backoff: 3,
            cause: DisconnectCause::Requested
        }
    );
}

#[test]
fn explicit_disconnect_wins_over_pending_loss() {
    let orch = orchestrator(ReconnectPolicy::default());
    orch.connect("x").unwrap();
    orch.on_disconnected(transport_loss()).unwrap();
    orch.reconnect().unwrap();

    orch.disconnect().unwrap();
    orch.on_disconnected(transport_loss()).unwrap();

    match orch.state() {
        ServiceState::Disconnected {
            reconnect, backoff, ..
        } => {
            assert!(!reconnect);
            assert_eq!(backoff, 6);
        }
        other => panic!("expected DISCONNECTED, got {}", other),
    }
}

#[test]
fn reconnect_after_explicit_disconnect_is_suppressed() {
    let orch = orchestrator(ReconnectPolicy::default());
    orch.connect("x").unwrap();
    orch.on_disconnected(transport_loss()).unwrap();
    orch.disconnect().unwrap();

    let mut actions = orch.subscribe_actions();
    let err = orch.reconnect().unwrap_err();
    assert!(matches!(err, SessionError::ReconnectSuppressed { state: "DISCONNECTING" }));
    assert!(drain(&mut actions).is_empty());
}

#[test]
fn backoff_resets_only_after_joined_then_explicit_cycle() {
    let orch = orchestrator(ReconnectPolicy::default());

    // Without reaching JOINED the grown backoff survives an explicit cycle.
    orch.connect("x").unwrap();
    orch.on_disconnected(None).unwrap();
    orch.disconnect().unwrap();
    orch.on_disconnected(None).unwrap();
    orch.connect("x").unwrap();
    assert_eq!(orch.backoff(), 6);

    orch.on_connected(SELF_SESSION).unwrap();
    orch.on_user_joined_channel(me(), ChannelRef::new(7, "x"), None).unwrap();
    orch.disconnect().unwrap();
    orch.on_disconnected(None).unwrap();
    assert_eq!(orch.state().channel_name(), "x");
    assert_eq!(orch.backoff(), 6);

    orch.connect("x").unwrap();
    assert_eq!(orch.backoff(), 3);
}

#[test]
fn joined_requires_the_full_path() {
    let orch = orchestrator(ReconnectPolicy::default());
    let err = orch
        .on_user_joined_channel(me(), ChannelRef::new(7, "x"), None)
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));

    orch.connect("x").unwrap();
    let err = orch
        .on_user_joined_channel(me(), ChannelRef::new(7, "x"), None)
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidTransition {
            state: "CONNECTING",
            trigger: "onUserJoinedChannel"
        }
    ));
    assert!(matches!(orch.state(), ServiceState::Connecting { .. }));
}

#[test]
fn create_channel_at_most_once_per_connected_entry() {
    let orch = orchestrator(ReconnectPolicy::default());
    let mut actions = orch.subscribe_actions();

    orch.connect("x").unwrap();
    orch.on_connected(SELF_SESSION).unwrap();
    orch.create_channel("x").unwrap();
    orch.create_channel("x").unwrap();

    orch.on_disconnected(None).unwrap();
    orch.reconnect().unwrap();
    orch.on_connected(SELF_SESSION).unwrap();
    orch.create_channel("x").unwrap();

    let creates = drain(&mut actions)
        .into_iter()
        .filter(|a| matches!(a, ServiceAction::CreateChannel(_)))
        .count();
    assert_eq!(creates, 2);
}

#[test]
fn create_channel_before_connected_is_invalid() {
    let orch = orchestrator(ReconnectPolicy::default());
    orch.connect("x").unwrap();
    let err = orch.create_channel("x").unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidState {
            operation: "create_channel",
            state: "CONNECTING"
        }
    ));
}

#[test]
fn tls_failure_is_terminal_and_observable() {
    let orch = orchestrator(ReconnectPolicy::default());
    let state_rx = orch.subscribe_state();
    orch.connect("x").unwrap();

    let chain = CertificateChain::new(vec![b"leaf".to_vec()]);
    orch.on_tls_handshake_failed(chain.clone()).unwrap();

    let observed = state_rx.borrow().clone();
    assert_eq!(
        observed,
        ServiceState::Disconnected {
            channel_name: "x".into(),
            reconnect: false,
            backoff: 3,
            cause: DisconnectCause::UntrustedCertificate(chain)
        }
    );
    assert!(matches!(
        orch.reconnect(),
        Err(SessionError::ReconnectSuppressed { .. })
    ));
}

#[test]
fn permission_denied_tears_down_and_reports() {
    let orch = orchestrator(ReconnectPolicy::default());
    orch.connect("x").unwrap();
    orch.on_connected(SELF_SESSION).unwrap();
    let mut actions = orch.subscribe_actions();

    orch.on_permission_denied("cannot create channel").unwrap();
    assert!(matches!(orch.state(), ServiceState::Disconnecting { .. }));
    assert_eq!(drain(&mut actions), vec![ServiceAction::Disconnect]);

    orch.on_disconnected(None).unwrap();
    match orch.state() {
        ServiceState::Disconnected { reconnect, cause, .. } => {
            assert!(!reconnect);
            assert_eq!(cause, DisconnectCause::PermissionDenied("cannot create channel".into()));
        }
        other => panic!("expected DISCONNECTED, got {}", other),
    }
}

#[test]
fn irrelevant_events_are_ignored() {
    let orch = orchestrator(ReconnectPolicy::default());
    orch.handle_event(VoiceEvent::LogMessage {
        message: "welcome".into(),
    })
    .unwrap();
    orch.handle_event(VoiceEvent::UserTalkStateChanged {
        user: me(),
        talking: true,
    })
    .unwrap();
    assert!(orch.state().is_disconnected());
}

#[test]
fn register_requires_connected() {
    let orch = orchestrator(ReconnectPolicy::default());
    assert!(matches!(
        orch.register(),
        Err(SessionError::InvalidState { operation: "register", .. })
    ));

    orch.connect("x").unwrap();
    orch.on_connected(SELF_SESSION).unwrap();
    let mut actions = orch.subscribe_actions();
    orch.register().unwrap();
    assert_eq!(drain(&mut actions), vec![ServiceAction::Register]);
    assert_eq!(
        orch.state(),
        ServiceState::Connected {
            channel_name: "x".into(),
            registered: true
        }
    );
}

#[test]
fn state_subscribers_see_latest_value() {
    let orch = orchestrator(ReconnectPolicy::default());
    orch.connect("x").unwrap();
    orch.on_connected(SELF_SESSION).unwrap();

    let late = orch.subscribe_state();
    assert!(matches!(*late.borrow(), ServiceState::Connected { .. }));
}

#[test]
fn local_session_tracks_connection() {
    let orch = orchestrator(ReconnectPolicy::default());
    assert_eq!(orch.local_session_id(), None);
    orch.connect("x").unwrap();
    orch.on_connected(SELF_SESSION).unwrap();
    assert_eq!(orch.local_session_id(), Some(SELF_SESSION));
    orch.on_disconnected(None).unwrap();
    assert_eq!(orch.local_session_id(), None);
}

#[test]
fn late_connected_after_hang_up_is_torn_down() {
    let orch = orchestrator(ReconnectPolicy::default());
    let mut actions = orch.subscribe_actions();

    orch.connect("late").unwrap();
    orch.disconnect().unwrap();
    // Provider had nothing to tear down yet
    orch.on_disconnected(None).unwrap();
    drain(&mut actions);

    orch.on_connected(SELF_SESSION).unwrap();
    assert_eq!(
        orch.state(),
        ServiceState::Disconnecting {
            channel_name: "late".into(),
            backoff: 3,
        }
    );
    assert_eq!(names(&drain(&mut actions)), vec!["DISCONNECT"]);

    orch.on_disconnected(None).unwrap();
    assert!(matches!(
        orch.state(),
        ServiceState::Disconnected {
            reconnect: false,
            cause: DisconnectCause::Requested,
            ..
        }
    ));
}

#[test]
fn late_connected_after_terminal_failure_stays_invalid() {
    let orch = orchestrator(ReconnectPolicy::default());
    orch.connect("x").unwrap();
    orch.on_tls_handshake_failed(CertificateChain::new(vec![b"leaf".to_vec()]))
        .unwrap();

    let err = orch.on_connected(SELF_SESSION).unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));
}
