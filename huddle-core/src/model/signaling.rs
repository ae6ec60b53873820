use crate::model::{RoomId, StoredMessage, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a client may send over the signaling socket.
///
/// SDP offers/answers and ICE candidates are carried as opaque JSON: the
/// relay routes them by `type` and `targetUserId` and never looks inside.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
    },
    LeaveRoom,
    #[serde(rename_all = "camelCase")]
    ChatMessage { content: String, user_name: String },
    #[serde(rename_all = "camelCase")]
    WebrtcOffer {
        offer: Value,
        target_user_id: UserId,
        from_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcAnswer {
        answer: Value,
        target_user_id: UserId,
        from_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        candidate: Value,
        target_user_id: UserId,
        from_user_id: UserId,
    },
}

impl ClientMessage {
    /// The exact-match routing target, for the directed variants.
    pub fn target_user(&self) -> Option<&UserId> {
        match self {
            Self::WebrtcOffer { target_user_id, .. }
            | Self::WebrtcAnswer { target_user_id, .. }
            | Self::IceCandidate { target_user_id, .. } => Some(target_user_id),
            _ => None,
        }
    }

    /// Re-wrap a directed message for delivery. Non-directed messages are
    /// not forwarded verbatim and yield `None`.
    pub fn into_forward(self) -> Option<ServerMessage> {
        match self {
            Self::WebrtcOffer {
                offer,
                target_user_id,
                from_user_id,
            } => Some(ServerMessage::WebrtcOffer {
                offer,
                target_user_id,
                from_user_id,
            }),
            Self::WebrtcAnswer {
                answer,
                target_user_id,
                from_user_id,
            } => Some(ServerMessage::WebrtcAnswer {
                answer,
                target_user_id,
                from_user_id,
            }),
            Self::IceCandidate {
                candidate,
                target_user_id,
                from_user_id,
            } => Some(ServerMessage::IceCandidate {
                candidate,
                target_user_id,
                from_user_id,
            }),
            _ => None,
        }
    }
}

/// Everything the relay may push to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    UserJoined { user_id: UserId, user_name: String },
    #[serde(rename_all = "camelCase")]
    UserLeft { user_id: UserId },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        message: StoredMessage,
        user_name: String,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcOffer {
        offer: Value,
        target_user_id: UserId,
        from_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcAnswer {
        answer: Value,
        target_user_id: UserId,
        from_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        candidate: Value,
        target_user_id: UserId,
        from_user_id: UserId,
    },
}
