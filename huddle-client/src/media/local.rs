use crate::media::pipeline::{
    BackgroundSpec, FilterSpec, Frame, FrameSource, FrameTransform, TransformSpec,
    spawn_transform_loop,
};
use crate::media::source::{CapturedMedia, MediaConstraints, MediaSource};
use crate::media::track::MediaTrack;
use async_trait::async_trait;
use huddle_core::MediaError;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

/// Where the mesh publishes a swapped video track. Implemented by the
/// mesh coordinator; tests substitute a recorder.
#[async_trait]
pub trait VideoPublisher: Send + Sync {
    async fn replace_video_track(&self, track: Arc<MediaTrack>);
}

/// Local-only conditions surfaced to the UI. Device trouble is guidance,
/// never a session failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaNotice {
    AcquisitionFailed(MediaError),
    AudioOnlyFallback,
    /// Both video and audio acquisition failed; running with zero tracks.
    EmptyFallback(MediaError),
    /// Screen share ended but the camera would not come back.
    CameraRestartFailed(MediaError),
}

/// Snapshot of the current local capture setup.
#[derive(Debug, Clone, Default)]
pub struct LocalMediaState {
    pub audio: Option<Arc<MediaTrack>>,
    pub video: Option<Arc<MediaTrack>>,
    pub screen_sharing: bool,
    pub background: BackgroundSpec,
    pub filter: FilterSpec,
}

struct LocalMediaInner {
    source: Arc<dyn MediaSource>,
    publisher: Arc<dyn VideoPublisher>,
    state: Mutex<LocalMediaState>,
    notices: mpsc::UnboundedSender<MediaNotice>,
    spec_tx: watch::Sender<TransformSpec>,
}

/// Owner of the local capture state. Every mutation goes through an
/// explicit transition here, so consumers always observe a consistent
/// snapshot instead of racing on a shared stream reference.
#[derive(Clone)]
pub struct LocalMedia {
    inner: Arc<LocalMediaInner>,
}

impl LocalMedia {
    pub fn new(
        source: Arc<dyn MediaSource>,
        publisher: Arc<dyn VideoPublisher>,
    ) -> (Self, mpsc::UnboundedReceiver<MediaNotice>) {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let (spec_tx, _) = watch::channel(TransformSpec::default());
        (
            Self {
                inner: Arc::new(LocalMediaInner {
                    source,
                    publisher,
                    state: Mutex::new(LocalMediaState::default()),
                    notices,
                    spec_tx,
                }),
            },
            notice_rx,
        )
    }

    /// Acquire camera and microphone, walking the fallback ladder instead
    /// of failing hard: full constraints, relaxed constraints, audio
    /// only, and finally a zero-track placeholder.
    pub async fn start(&self) -> LocalMediaState {
        let captured = self.acquire_with_fallback().await;

        let mut state = self.inner.state.lock().await;
        state.audio = captured.audio;
        state.video = captured.video;
        state.screen_sharing = false;
        state.clone()
    }

    async fn acquire_with_fallback(&self) -> CapturedMedia {
        let constraints = MediaConstraints::audio_video();
        match self.inner.source.acquire(constraints.clone()).await {
            Ok(captured) => return captured,
            Err(MediaError::ConstraintsUnsatisfiable) => {
                debug!("constraints rejected, retrying relaxed");
                match self.inner.source.acquire(constraints.relaxed()).await {
                    Ok(captured) => return captured,
                    Err(e) => self.notify(MediaNotice::AcquisitionFailed(e)),
                }
            }
            Err(e) => self.notify(MediaNotice::AcquisitionFailed(e)),
        }

        match self.inner.source.acquire(MediaConstraints::audio_only()).await {
            Ok(captured) => {
                info!("video unavailable, continuing audio-only");
                self.notify(MediaNotice::AudioOnlyFallback);
                captured
            }
            Err(e) => {
                warn!(error = %e, "all acquisition failed, continuing with zero tracks");
                self.notify(MediaNotice::EmptyFallback(e));
                CapturedMedia::empty()
            }
        }
    }

    pub async fn state(&self) -> LocalMediaState {
        self.inner.state.lock().await.clone()
    }

    pub async fn set_audio_enabled(&self, enabled: bool) {
        if let Some(audio) = &self.inner.state.lock().await.audio {
            audio.set_enabled(enabled);
        }
    }

    pub async fn set_video_enabled(&self, enabled: bool) {
        if let Some(video) = &self.inner.state.lock().await.video {
            video.set_enabled(enabled);
        }
    }

    /// Start publishing the screen instead of the camera. Audio is not
    /// touched; every live link gets the new track in place.
    pub async fn start_screen_share(&self) -> Result<Arc<MediaTrack>, MediaError> {
        let captured = self.inner.source.acquire_display().await?;
        let screen = captured.video.ok_or(MediaError::DeviceNotFound)?;

        {
            let mut state = self.inner.state.lock().await;
            state.video = Some(screen.clone());
            state.screen_sharing = true;
        }
        self.inner.publisher.replace_video_track(screen.clone()).await;

        // The user can end the capture from outside (browser UI); restore
        // the camera when that happens.
        let media = self.clone();
        let watched = screen.clone();
        tokio::spawn(async move {
            watched.ended().await;
            media.on_screen_share_ended(&watched).await;
        });

        Ok(screen)
    }

    pub async fn stop_screen_share(&self) {
        let screen = {
            let mut state = self.inner.state.lock().await;
            if !state.screen_sharing {
                return;
            }
            // Cleared before ending the track so the external-end watcher
            // knows this stop was deliberate.
            state.screen_sharing = false;
            state.video.clone()
        };
        if let Some(screen) = screen {
            screen.end();
        }
        self.restore_camera().await;
    }

    async fn on_screen_share_ended(&self, ended: &Arc<MediaTrack>) {
        {
            let mut state = self.inner.state.lock().await;
            let current = state.video.as_ref().map(|v| v.id());
            if !state.screen_sharing || current != Some(ended.id()) {
                return;
            }
            state.screen_sharing = false;
        }
        info!("screen share ended externally, restoring camera");
        self.restore_camera().await;
    }

    async fn restore_camera(&self) {
        let captured = match self.inner.source.acquire(MediaConstraints::video_only()).await {
            Ok(captured) => captured,
            Err(e) => {
                warn!(error = %e, "camera reacquisition failed; video stays degraded");
                self.notify(MediaNotice::CameraRestartFailed(e));
                return;
            }
        };
        let Some(camera) = captured.video else {
            self.notify(MediaNotice::CameraRestartFailed(MediaError::DeviceNotFound));
            return;
        };

        self.inner.state.lock().await.video = Some(camera.clone());
        self.inner.publisher.replace_video_track(camera).await;
    }

    pub async fn set_background(&self, background: BackgroundSpec) {
        let mut state = self.inner.state.lock().await;
        state.background = background;
        self.push_spec(&state);
    }

    pub async fn set_filter(&self, filter: FilterSpec) {
        let mut state = self.inner.state.lock().await;
        state.filter = filter;
        self.push_spec(&state);
    }

    /// Wire a frame source through the effects transform at the fixed
    /// pipeline rate; spec changes apply live.
    pub fn spawn_transform_loop(
        &self,
        source: Arc<dyn FrameSource>,
        transform: Arc<dyn FrameTransform>,
    ) -> mpsc::Receiver<Frame> {
        spawn_transform_loop(source, transform, self.inner.spec_tx.subscribe())
    }

    /// End every local track. Peer links are the mesh's to close.
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(audio) = state.audio.take() {
            audio.end();
        }
        if let Some(video) = state.video.take() {
            video.end();
        }
        state.screen_sharing = false;
    }

    fn push_spec(&self, state: &LocalMediaState) {
        let _ = self.inner.spec_tx.send(TransformSpec {
            background: state.background,
            filter: state.filter,
        });
    }

    fn notify(&self, notice: MediaNotice) {
        let _ = self.inner.notices.send(notice);
    }
}
