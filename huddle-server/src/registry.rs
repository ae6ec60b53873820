use dashmap::DashMap;
use huddle_core::{ConnectionId, RoomId, ServerMessage, UserId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Room and user identity a connection picked up by joining a room.
#[derive(Debug, Clone)]
pub struct Binding {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub user_name: String,
}

struct ConnectionEntry {
    tx: mpsc::UnboundedSender<ServerMessage>,
    binding: Option<Binding>,
}

/// Ephemeral map of live signaling connections and their room bindings.
///
/// Owned exclusively by the relay; callers only get bind/unbind/broadcast/
/// forward operations, never the map itself. Nothing here survives a
/// process restart.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    connections: Arc<DashMap<ConnectionId, ConnectionEntry>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh, unbound connection and hand back its id.
    pub fn register(&self, tx: mpsc::UnboundedSender<ServerMessage>) -> ConnectionId {
        let id = ConnectionId::new();
        self.connections
            .insert(id, ConnectionEntry { tx, binding: None });
        id
    }

    /// Bind a connection to a room. A connection is bound to at most one
    /// room at a time; rebinding replaces the previous binding.
    pub fn bind(&self, conn: ConnectionId, binding: Binding) {
        if let Some(mut entry) = self.connections.get_mut(&conn) {
            entry.binding = Some(binding);
        }
    }

    /// Drop the room binding but keep the connection registered.
    pub fn unbind(&self, conn: ConnectionId) -> Option<Binding> {
        self.connections.get_mut(&conn)?.binding.take()
    }

    /// Forget the connection entirely (socket closed).
    pub fn remove(&self, conn: ConnectionId) -> Option<Binding> {
        self.connections.remove(&conn)?.1.binding
    }

    pub fn binding(&self, conn: ConnectionId) -> Option<Binding> {
        self.connections.get(&conn)?.binding.clone()
    }

    /// Deliver to every connection bound to `room` except `sender`.
    pub fn broadcast_to_room(
        &self,
        room: &RoomId,
        msg: &ServerMessage,
        sender: Option<ConnectionId>,
    ) {
        for entry in self.connections.iter() {
            if Some(*entry.key()) == sender {
                continue;
            }
            let Some(binding) = &entry.binding else {
                continue;
            };
            if &binding.room_id != room {
                continue;
            }
            if entry.tx.send(msg.clone()).is_err() {
                debug!(conn = %entry.key(), "dropping broadcast to closed connection");
            }
        }
    }

    /// Deliver to the connection whose bound user id matches exactly.
    /// Returns false when no such binding exists; the message is gone.
    pub fn forward_to_user(&self, target: &UserId, msg: ServerMessage) -> bool {
        for entry in self.connections.iter() {
            let Some(binding) = &entry.binding else {
                continue;
            };
            if &binding.user_id == target {
                return entry.tx.send(msg).is_ok();
            }
        }
        false
    }

    /// Currently joined members of a room.
    pub fn members(&self, room: &RoomId) -> Vec<(UserId, String)> {
        self.connections
            .iter()
            .filter_map(|entry| {
                let binding = entry.binding.as_ref()?;
                (&binding.room_id == room)
                    .then(|| (binding.user_id.clone(), binding.user_name.clone()))
            })
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
