use crate::engine::SignalSink;
use crate::mesh::MeshCoordinator;
use async_trait::async_trait;
use huddle_core::{ClientMessage, RoomId, ServerMessage, SignalError, StoredMessage, UserId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, info, warn};

/// Delay before resending `join-room` after an abnormal close.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Joined,
}

/// What a live signaling connection produces.
#[derive(Debug)]
pub enum TransportEvent {
    Signal(ServerMessage),
    Closed { clean: bool },
}

/// One established signaling connection: somewhere to send, a stream of
/// inbound events.
pub struct SignalConnection {
    pub sink: Arc<dyn SignalSink>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Dials the relay. Real implementations wrap a WebSocket; tests script
/// connections.
#[async_trait]
pub trait SignalTransport: Send + Sync {
    async fn connect(&self) -> Result<SignalConnection, SignalError>;
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room: RoomId,
    pub user: UserId,
    pub user_name: String,
    pub reconnect_delay: Duration,
}

impl SessionConfig {
    pub fn new(room: RoomId, user: UserId, user_name: impl Into<String>) -> Self {
        Self {
            room,
            user,
            user_name: user_name.into(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// Outgoing signal path that survives reconnects: the session points it
/// at the live connection, and sends while disconnected are dropped
/// silently (they are best-effort and time-sensitive anyway).
#[derive(Clone, Default)]
pub struct SessionSink {
    inner: Arc<RwLock<Option<Arc<dyn SignalSink>>>>,
}

impl SessionSink {
    pub fn new() -> Self {
        Self::default()
    }

    async fn attach(&self, sink: Arc<dyn SignalSink>) {
        *self.inner.write().await = Some(sink);
    }

    async fn detach(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl SignalSink for SessionSink {
    async fn send(&self, msg: ClientMessage) {
        let sink = self.inner.read().await.clone();
        match sink {
            Some(sink) => sink.send(msg).await,
            None => debug!("transport closed, dropping outbound signal"),
        }
    }
}

/// Application-side view of a running session.
pub struct SessionHandle {
    state: watch::Receiver<SessionState>,
    chat: mpsc::UnboundedReceiver<StoredMessage>,
    shutdown: mpsc::Sender<()>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Block until the session reports `target`.
    pub async fn wait_for(&self, target: SessionState) {
        let mut rx = self.state.clone();
        loop {
            if *rx.borrow_and_update() == target {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub async fn next_chat(&mut self) -> Option<StoredMessage> {
        self.chat.recv().await
    }

    /// Leave the room and end the session for good (clean close).
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(()).await;
    }
}

/// Presence state machine: Disconnected → Connecting → Joined, back to
/// Disconnected on close. A non-clean close reconnects after a fixed
/// delay with the same identity; every reconnect is a fresh join and the
/// mesh is rebuilt from scratch off the `user-joined` events that follow.
pub struct Session {
    config: SessionConfig,
    transport: Arc<dyn SignalTransport>,
    mesh: Arc<MeshCoordinator>,
    sink: SessionSink,
}

impl Session {
    pub fn spawn(
        config: SessionConfig,
        transport: Arc<dyn SignalTransport>,
        mesh: Arc<MeshCoordinator>,
        sink: SessionSink,
    ) -> SessionHandle {
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let (chat_tx, chat_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let session = Self {
            config,
            transport,
            mesh,
            sink,
        };
        tokio::spawn(session.run(state_tx, chat_tx, shutdown_rx));

        SessionHandle {
            state: state_rx,
            chat: chat_rx,
            shutdown: shutdown_tx,
        }
    }

    async fn run(
        self,
        state_tx: watch::Sender<SessionState>,
        chat_tx: mpsc::UnboundedSender<StoredMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            let _ = state_tx.send(SessionState::Connecting);

            let connection = match self.transport.connect().await {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(error = %e, "signaling connect failed, retrying");
                    let _ = state_tx.send(SessionState::Disconnected);
                    tokio::time::sleep(self.config.reconnect_delay).await;
                    continue;
                }
            };

            self.sink.attach(connection.sink.clone()).await;
            self.sink
                .send(ClientMessage::JoinRoom {
                    room_id: self.config.room.clone(),
                    user_id: self.config.user.clone(),
                    user_name: self.config.user_name.clone(),
                })
                .await;
            let _ = state_tx.send(SessionState::Joined);
            info!(room = %self.config.room, user = %self.config.user, "joined room");

            let outcome = self
                .pump_events(connection.events, &chat_tx, &mut shutdown_rx)
                .await;

            // No link survives a signaling gap: the mesh is rebuilt from
            // the join that follows.
            self.sink.detach().await;
            self.mesh.shutdown().await;
            let _ = state_tx.send(SessionState::Disconnected);

            match outcome {
                Outcome::CleanClose => {
                    info!("session ended cleanly");
                    return;
                }
                Outcome::Shutdown => {
                    info!("session shut down locally");
                    return;
                }
                Outcome::Lost => {
                    warn!(
                        delay_ms = self.config.reconnect_delay.as_millis() as u64,
                        "connection lost, rejoining after delay"
                    );
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
            }
        }
    }

    async fn pump_events(
        &self,
        mut events: mpsc::Receiver<TransportEvent>,
        chat_tx: &mpsc::UnboundedSender<StoredMessage>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> Outcome {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    self.sink.send(ClientMessage::LeaveRoom).await;
                    return Outcome::Shutdown;
                }
                event = events.recv() => match event {
                    Some(TransportEvent::Signal(msg)) => match msg {
                        ServerMessage::ChatMessage { message, .. } => {
                            let _ = chat_tx.send(message);
                        }
                        other => self.mesh.handle_signal(other).await,
                    },
                    Some(TransportEvent::Closed { clean: true }) => return Outcome::CleanClose,
                    Some(TransportEvent::Closed { clean: false }) => return Outcome::Lost,
                    // Transport task dropped without a close frame.
                    None => return Outcome::Lost,
                },
            }
        }
    }
}

enum Outcome {
    CleanClose,
    Shutdown,
    Lost,
}
