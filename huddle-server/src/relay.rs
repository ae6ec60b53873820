use crate::registry::{Binding, RoomRegistry};
use crate::store::{MessageStore, ParticipantStore};
use huddle_core::{ClientMessage, ConnectionId, RoomId, ServerMessage, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The signaling relay: routes control-plane messages between connections
/// and keeps the ephemeral room membership. Never touches media payloads.
#[derive(Clone)]
pub struct Relay {
    registry: RoomRegistry,
    participants: Arc<dyn ParticipantStore>,
    messages: Arc<dyn MessageStore>,
}

impl Relay {
    pub fn new(
        registry: RoomRegistry,
        participants: Arc<dyn ParticipantStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            registry,
            participants,
            messages,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Entry point for raw socket text. Malformed input is logged and
    /// dropped; the connection stays open.
    pub async fn handle_text(&self, conn: ConnectionId, raw: &str) {
        match serde_json::from_str::<ClientMessage>(raw) {
            Ok(msg) => self.dispatch(conn, msg).await,
            Err(e) => warn!(%conn, error = %e, "ignoring malformed signaling message"),
        }
    }

    pub async fn dispatch(&self, conn: ConnectionId, msg: ClientMessage) {
        match msg {
            ClientMessage::JoinRoom {
                room_id,
                user_id,
                user_name,
            } => self.handle_join(conn, room_id, user_id, user_name).await,

            ClientMessage::LeaveRoom => self.handle_leave(conn).await,

            ClientMessage::ChatMessage { content, user_name } => {
                self.handle_chat(conn, content, user_name).await;
            }

            directed @ (ClientMessage::WebrtcOffer { .. }
            | ClientMessage::WebrtcAnswer { .. }
            | ClientMessage::IceCandidate { .. }) => self.handle_directed(directed),
        }
    }

    async fn handle_join(
        &self,
        conn: ConnectionId,
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
    ) {
        info!(%conn, user = %user_id, room = %room_id, "join-room");

        self.registry.bind(
            conn,
            Binding {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
                user_name: user_name.clone(),
            },
        );

        if let Err(e) = self.participants.add_participant(&room_id, &user_id).await {
            warn!(user = %user_id, error = %e, "participant store rejected join");
        }

        // Joiner gets nothing back; success is implicit.
        self.registry.broadcast_to_room(
            &room_id,
            &ServerMessage::UserJoined { user_id, user_name },
            Some(conn),
        );
    }

    /// Explicit leave-room: the connection stays registered, unbound.
    async fn handle_leave(&self, conn: ConnectionId) {
        let Some(binding) = self.registry.unbind(conn) else {
            debug!(%conn, "leave-room from unbound connection");
            return;
        };
        self.finish_leave(binding).await;
    }

    /// Socket close: the connection is gone for good.
    pub async fn handle_disconnect(&self, conn: ConnectionId) {
        let Some(binding) = self.registry.remove(conn) else {
            return;
        };
        self.finish_leave(binding).await;
    }

    /// Participant removal must complete before the user-left broadcast,
    /// or a fast rejoin can observe stale membership.
    async fn finish_leave(&self, binding: Binding) {
        info!(user = %binding.user_id, room = %binding.room_id, "user left");

        if let Err(e) = self
            .participants
            .remove_participant(&binding.room_id, &binding.user_id)
            .await
        {
            warn!(user = %binding.user_id, error = %e, "participant store rejected removal");
        }

        self.registry.broadcast_to_room(
            &binding.room_id,
            &ServerMessage::UserLeft {
                user_id: binding.user_id,
            },
            None,
        );
    }

    async fn handle_chat(&self, conn: ConnectionId, content: String, user_name: String) {
        let Some(binding) = self.registry.binding(conn) else {
            debug!(%conn, "chat-message from connection outside any room");
            return;
        };

        let stored = match self
            .messages
            .create_message(&binding.room_id, &binding.user_id, content)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                warn!(user = %binding.user_id, error = %e, "message store rejected chat message");
                return;
            }
        };

        self.registry.broadcast_to_room(
            &binding.room_id,
            &ServerMessage::ChatMessage {
                message: stored,
                user_name,
            },
            Some(conn),
        );
    }

    /// Offer/answer/candidate: best-effort, time-sensitive. No target
    /// binding means the message is silently dropped, never retried.
    fn handle_directed(&self, msg: ClientMessage) {
        let Some(target) = msg.target_user().cloned() else {
            return;
        };
        let Some(forward) = msg.into_forward() else {
            return;
        };
        if !self.registry.forward_to_user(&target, forward) {
            debug!(target = %target, "dropping directed message for unknown user");
        }
    }
}
