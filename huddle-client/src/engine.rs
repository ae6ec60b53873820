use crate::media::MediaTrack;
use async_trait::async_trait;
use huddle_core::ClientMessage;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("peer connection engine: {0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// One encrypted media connection to a single remote participant, as
/// provided by the platform RTC stack (browser API or a native agent).
///
/// Session descriptions and candidates are opaque JSON throughout; the
/// mesh layer sequences them but never inspects them.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<Value, EngineError>;
    async fn create_answer(&self) -> Result<Value, EngineError>;
    async fn set_local_description(&self, desc: Value) -> Result<(), EngineError>;
    async fn set_remote_description(&self, desc: Value) -> Result<(), EngineError>;
    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), EngineError>;
    /// Publish a local track on this connection.
    async fn attach_track(&self, track: Arc<MediaTrack>) -> Result<(), EngineError>;
    /// Swap the outgoing video track in place, without renegotiating.
    async fn replace_video_track(&self, track: Arc<MediaTrack>) -> Result<(), EngineError>;
    async fn close(&self);
}

/// Factory for per-peer connections.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn create_connection(&self) -> Result<Box<dyn PeerConnection>, EngineError>;
}

/// Outgoing signaling path. Sends are best-effort: a closed transport
/// swallows the message, matching the relay's own drop semantics.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send(&self, msg: ClientMessage);
}
