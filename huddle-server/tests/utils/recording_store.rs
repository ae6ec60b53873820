use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{RoomId, StoredMessage, UserId};
use huddle_server::{MessageStore, ParticipantStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

/// Everything the relay asked the stores to do, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    AddParticipant { room: RoomId, user: UserId },
    RemoveParticipant { room: RoomId, user: UserId },
    CreateMessage { room: RoomId, content: String },
}

/// Store double that records every call, for ordering assertions.
#[derive(Default)]
pub struct RecordingStore {
    ops: Mutex<Vec<StoreOp>>,
    next_id: AtomicI64,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().await.clone()
    }
}

#[async_trait]
impl ParticipantStore for RecordingStore {
    async fn add_participant(&self, room: &RoomId, user: &UserId) -> Result<()> {
        self.ops.lock().await.push(StoreOp::AddParticipant {
            room: room.clone(),
            user: user.clone(),
        });
        Ok(())
    }

    async fn remove_participant(&self, room: &RoomId, user: &UserId) -> Result<()> {
        self.ops.lock().await.push(StoreOp::RemoveParticipant {
            room: room.clone(),
            user: user.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl MessageStore for RecordingStore {
    async fn create_message(
        &self,
        room: &RoomId,
        user: &UserId,
        content: String,
    ) -> Result<StoredMessage> {
        self.ops.lock().await.push(StoreOp::CreateMessage {
            room: room.clone(),
            content: content.clone(),
        });
        Ok(StoredMessage {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            room_id: room.clone(),
            user_id: user.clone(),
            content,
            created_at: 0,
        })
    }
}
