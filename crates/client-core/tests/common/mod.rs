//! In-memory voice provider for driver tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use talkbridge_session_core::{
    CertificateChain, Channel, ChannelRef, ChannelRequest, ConnectionError, ProviderError,
    ProviderResult, ServerDescriptor, VoiceEvent, VoiceServerConfig, VoiceSessionProvider,
    VoiceUser,
};

pub const SELF_SESSION: u32 = 17;

/// How the next connect attempts should end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Succeed,
    LoseTransport,
    FailTls,
    /// Accept, but report `Connected` only after the delay
    ConnectLate(Duration),
}

pub struct MockProvider {
    events: broadcast::Sender<VoiceEvent>,
    connected: Arc<AtomicBool>,
    session_channel: Channel,
    next_channel_id: AtomicU32,
    channels: Mutex<HashMap<u32, String>>,
    outcomes: Mutex<Vec<ConnectOutcome>>,
    pub connects: Mutex<Vec<ServerDescriptor>>,
    pub created: Mutex<Vec<ChannelRequest>>,
    pub joined: Mutex<Vec<u32>>,
    pub registered: Mutex<Vec<u32>>,
    pub disconnects: AtomicUsize,
}

impl MockProvider {
    /// Provider whose root channel has an `openchannel` with id 2
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            connected: Arc::new(AtomicBool::new(false)),
            session_channel: Channel::new(0, "Root").with_subchannels(vec![
                Channel::new(1, "lobby"),
                Channel::new(2, "openchannel"),
            ]),
            next_channel_id: AtomicU32::new(100),
            channels: Mutex::new(HashMap::new()),
            outcomes: Mutex::new(Vec::new()),
            connects: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            joined: Mutex::new(Vec::new()),
            registered: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
        }
    }

    /// Queue outcomes for the next connect attempts; later attempts succeed
    pub fn with_outcomes(self, outcomes: Vec<ConnectOutcome>) -> Self {
        *self.outcomes.lock() = outcomes;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    /// Simulate the server dropping an established connection
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.events.send(VoiceEvent::Disconnected {
            error: Some(ConnectionError::Transport("network unreachable".into())),
        });
    }

    fn me() -> VoiceUser {
        VoiceUser {
            session_id: SELF_SESSION,
            name: "me".into(),
        }
    }
}

#[async_trait]
impl VoiceSessionProvider for MockProvider {
    async fn connect(&self, server: ServerDescriptor) -> ProviderResult<()> {
        self.connects.lock().push(server);
        let outcome = {
            let mut outcomes = self.outcomes.lock();
            if outcomes.is_empty() {
                ConnectOutcome::Succeed
            } else {
                outcomes.remove(0)
            }
        };

        let event = match outcome {
            ConnectOutcome::Succeed => {
                self.connected.store(true, Ordering::SeqCst);
                VoiceEvent::Connected {
                    session_id: SELF_SESSION,
                }
            }
            ConnectOutcome::LoseTransport => VoiceEvent::Disconnected {
                error: Some(ConnectionError::Transport("connection refused".into())),
            },
            ConnectOutcome::FailTls => VoiceEvent::TlsHandshakeFailed {
                chain: CertificateChain::new(vec![b"self-signed".to_vec()]),
            },
            ConnectOutcome::ConnectLate(delay) => {
                let connected = self.connected.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    connected.store(true, Ordering::SeqCst);
                    let _ = events.send(VoiceEvent::Connected {
                        session_id: SELF_SESSION,
                    });
                });
                return Ok(());
            }
        };
        let _ = self.events.send(event);
        Ok(())
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Err(ProviderError::NotConnected);
        }
        let _ = self.events.send(VoiceEvent::Disconnected { error: None });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn session_id(&self) -> Option<u32> {
        self.is_connected().then_some(SELF_SESSION)
    }

    fn session_channel(&self) -> Option<Channel> {
        self.is_connected().then(|| self.session_channel.clone())
    }

    async fn create_channel(&self, request: ChannelRequest) -> ProviderResult<u32> {
        if !self.is_connected() {
            return Err(ProviderError::NotConnected);
        }
        let id = self.next_channel_id.fetch_add(1, Ordering::SeqCst);
        self.channels.lock().insert(id, request.name.clone());
        let _ = self.events.send(VoiceEvent::ChannelAdded {
            channel: ChannelRef::new(id, request.name.clone()),
        });
        self.created.lock().push(request);
        Ok(id)
    }

    async fn join_channel(&self, channel_id: u32) -> ProviderResult<()> {
        let name = self
            .channels
            .lock()
            .get(&channel_id)
            .cloned()
            .ok_or_else(|| ProviderError::Other(format!("no channel {}", channel_id)))?;
        self.joined.lock().push(channel_id);
        let _ = self.events.send(VoiceEvent::UserJoinedChannel {
            user: Self::me(),
            channel: ChannelRef::new(channel_id, name),
            previous: Some(ChannelRef::new(0, "Root")),
        });
        Ok(())
    }

    async fn register_user(&self, session_id: u32) -> ProviderResult<()> {
        self.registered.lock().push(session_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.events.subscribe()
    }
}

pub fn server() -> VoiceServerConfig {
    VoiceServerConfig::builder()
        .host("voice.test")
        .password("pw")
        .build()
        .unwrap()
}
