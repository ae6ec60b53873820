use async_trait::async_trait;
use huddle_client::engine::SignalSink;
use huddle_client::media::{CapturedMedia, MediaConstraints, MediaSource, MediaTrack, VideoPublisher};
use huddle_client::session::{SignalConnection, SignalTransport, TransportEvent};
use huddle_core::{MediaError, SignalError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Device double fed a script of acquisition outcomes, consumed one per
/// `acquire` call. Records the constraints it was asked for.
#[derive(Default)]
pub struct ScriptedSource {
    acquires: Mutex<VecDeque<Result<CapturedMedia, MediaError>>>,
    displays: Mutex<VecDeque<Result<CapturedMedia, MediaError>>>,
    asked: Mutex<Vec<MediaConstraints>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_acquire(&self, outcome: Result<CapturedMedia, MediaError>) {
        self.acquires.lock().unwrap().push_back(outcome);
    }

    pub fn script_display(&self, outcome: Result<CapturedMedia, MediaError>) {
        self.displays.lock().unwrap().push_back(outcome);
    }

    /// Constraints passed to `acquire`, in call order.
    pub fn asked(&self) -> Vec<MediaConstraints> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSource for ScriptedSource {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<CapturedMedia, MediaError> {
        self.asked.lock().unwrap().push(constraints);
        self.acquires
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(MediaError::DeviceNotFound))
    }

    async fn acquire_display(&self) -> Result<CapturedMedia, MediaError> {
        self.displays
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(MediaError::DeviceNotFound))
    }
}

/// Publisher double: remembers every track swapped in, in order.
#[derive(Default)]
pub struct RecordingPublisher {
    replaced: Mutex<Vec<Arc<MediaTrack>>>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replaced(&self) -> Vec<Arc<MediaTrack>> {
        self.replaced.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoPublisher for RecordingPublisher {
    async fn replace_video_track(&self, track: Arc<MediaTrack>) {
        self.replaced.lock().unwrap().push(track);
    }
}

/// Build a signaling connection whose inbound side the test drives.
pub fn scripted_connection(
    sink: Arc<dyn SignalSink>,
) -> (SignalConnection, mpsc::Sender<TransportEvent>) {
    let (tx, rx) = mpsc::channel(64);
    (SignalConnection { sink, events: rx }, tx)
}

/// Transport double: each `connect` pops the next scripted outcome. Once
/// the script runs dry, `connect` suspends forever, which pins a session
/// in Connecting where a test can count attempts.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<SignalConnection, SignalError>>>,
    connects: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_connect(&self, outcome: Result<SignalConnection, SignalError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalTransport for ScriptedTransport {
    async fn connect(&self) -> Result<SignalConnection, SignalError> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(outcome) => {
                self.connects.fetch_add(1, Ordering::SeqCst);
                outcome
            }
            None => futures::future::pending().await,
        }
    }
}
