use anyhow::{Context, Result, bail};
use huddle_core::{ClientMessage, ConnectionId, RoomId, ServerMessage, UserId};
use huddle_server::{MessageStore, ParticipantStore, Relay, RoomRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;

use super::RecordingStore;

pub const RECV_TIMEOUT_MS: u64 = 1000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_relay() -> (Relay, Arc<RecordingStore>) {
    let store = RecordingStore::new();
    let relay = Relay::new(RoomRegistry::new(), store.clone(), store.clone());
    (relay, store)
}

pub fn create_relay_with(
    participants: Arc<dyn ParticipantStore>,
    messages: Arc<dyn MessageStore>,
) -> Relay {
    Relay::new(RoomRegistry::new(), participants, messages)
}

/// One simulated client connection, seen from the relay's side.
pub struct TestPeer {
    pub conn: ConnectionId,
    pub user: UserId,
    pub rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl TestPeer {
    /// Register a connection and join it to `room`.
    pub async fn join(relay: &Relay, room: &RoomId, user: &str) -> Self {
        let peer = Self::register(relay, user);
        relay
            .dispatch(
                peer.conn,
                ClientMessage::JoinRoom {
                    room_id: room.clone(),
                    user_id: peer.user.clone(),
                    user_name: user.to_string(),
                },
            )
            .await;
        peer
    }

    /// Register a connection without joining any room.
    pub fn register(relay: &Relay, user: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = relay.registry().register(tx);
        Self {
            conn,
            user: UserId::from(user),
            rx,
        }
    }

    pub async fn send(&self, relay: &Relay, msg: ClientMessage) {
        relay.dispatch(self.conn, msg).await;
    }

    /// Receive the next pushed message, failing after a short timeout.
    pub async fn recv(&mut self) -> Result<ServerMessage> {
        tokio::time::timeout(Duration::from_millis(RECV_TIMEOUT_MS), self.rx.recv())
            .await
            .context("timed out waiting for server message")?
            .context("connection channel closed")
    }

    /// Assert nothing is pending for this peer.
    pub fn assert_silent(&mut self) -> Result<()> {
        match self.rx.try_recv() {
            Err(mpsc::error::TryRecvError::Empty) => Ok(()),
            Ok(msg) => bail!("expected no message, got {msg:?}"),
            Err(e) => bail!("connection channel broken: {e}"),
        }
    }
}
