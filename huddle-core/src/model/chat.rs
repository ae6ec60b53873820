use crate::model::{RoomId, UserId};
use serde::{Deserialize, Serialize};

/// A chat message as echoed back after the message store accepted it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: i64,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub content: String,
    /// Unix timestamp in milliseconds, assigned by the store.
    pub created_at: u64,
}
