use crate::media::MediaTrack;
use async_trait::async_trait;
use huddle_core::MediaError;
use std::sync::Arc;

/// What to ask the capture device for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
}

impl MediaConstraints {
    pub fn audio_video() -> Self {
        Self {
            audio: true,
            video: true,
            video_width: None,
            video_height: None,
        }
    }

    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: false,
            video_width: None,
            video_height: None,
        }
    }

    pub fn video_only() -> Self {
        Self {
            audio: false,
            video: true,
            video_width: None,
            video_height: None,
        }
    }

    /// The fallback shape used after the device rejects the first ask.
    pub fn relaxed(&self) -> Self {
        Self {
            audio: self.audio,
            video: self.video,
            video_width: Some(640),
            video_height: Some(480),
        }
    }
}

/// Tracks a single acquisition produced. Either may be absent.
#[derive(Debug, Clone, Default)]
pub struct CapturedMedia {
    pub audio: Option<Arc<MediaTrack>>,
    pub video: Option<Arc<MediaTrack>>,
}

impl CapturedMedia {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn track_count(&self) -> usize {
        self.audio.is_some() as usize + self.video.is_some() as usize
    }
}

/// Platform capture devices. `acquire` may suspend indefinitely while the
/// user stares at a permission prompt; there is deliberately no internal
/// timeout, so callers must show a persistent waiting state.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<CapturedMedia, MediaError>;
    async fn acquire_display(&self) -> Result<CapturedMedia, MediaError>;
}
