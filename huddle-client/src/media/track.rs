use huddle_core::TrackId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    Screen,
}

/// One live capture track. Shared as `Arc<MediaTrack>`; the pointer is
/// the track identity the mesh publishes, so in-place replacement means
/// handing every sender a different `Arc`.
#[derive(Debug)]
pub struct MediaTrack {
    id: TrackId,
    kind: TrackKind,
    source: TrackSource,
    enabled: AtomicBool,
    ended_tx: watch::Sender<bool>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, source: TrackSource) -> Arc<Self> {
        let (ended_tx, _) = watch::channel(false);
        Arc::new(Self {
            id: TrackId::new(),
            kind,
            source,
            enabled: AtomicBool::new(true),
            ended_tx,
        })
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn is_video(&self) -> bool {
        self.kind == TrackKind::Video
    }

    pub fn is_audio(&self) -> bool {
        self.kind == TrackKind::Audio
    }

    /// Mute/unmute without touching the track lifecycle.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Terminate the track. Also how an external end is modeled: the
    /// browser's "stop sharing" button ends a screen track from outside.
    pub fn end(&self) {
        let _ = self.ended_tx.send(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.ended_tx.borrow()
    }

    /// Resolves once the track has ended.
    pub async fn ended(&self) {
        let mut rx = self.ended_tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
