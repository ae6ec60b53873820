use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::{RoomId, StoredMessage, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// External participant roster. The relay awaits `remove_participant`
/// before announcing a leave so a fast rejoin never sees stale membership.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    async fn add_participant(&self, room: &RoomId, user: &UserId) -> Result<()>;
    async fn remove_participant(&self, room: &RoomId, user: &UserId) -> Result<()>;
}

/// External chat persistence. Awaited before the chat broadcast; the
/// offer/answer/ICE path never goes near it.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_message(
        &self,
        room: &RoomId,
        user: &UserId,
        content: String,
    ) -> Result<StoredMessage>;
}

/// In-process store backing the bundled relay binary and the tests.
#[derive(Default)]
pub struct MemoryStore {
    participants: DashMap<RoomId, HashSet<UserId>>,
    messages: Mutex<Vec<StoredMessage>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn participants_in(&self, room: &RoomId) -> usize {
        self.participants.get(room).map_or(0, |set| set.len())
    }

    pub async fn message_count(&self) -> usize {
        self.messages.lock().await.len()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl ParticipantStore for MemoryStore {
    async fn add_participant(&self, room: &RoomId, user: &UserId) -> Result<()> {
        self.participants
            .entry(room.clone())
            .or_default()
            .insert(user.clone());
        Ok(())
    }

    async fn remove_participant(&self, room: &RoomId, user: &UserId) -> Result<()> {
        if let Some(mut set) = self.participants.get_mut(room) {
            set.remove(user);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create_message(
        &self,
        room: &RoomId,
        user: &UserId,
        content: String,
    ) -> Result<StoredMessage> {
        let message = StoredMessage {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            room_id: room.clone(),
            user_id: user.clone(),
            content,
            created_at: now_millis(),
        };
        self.messages.lock().await.push(message.clone());
        Ok(message)
    }
}
