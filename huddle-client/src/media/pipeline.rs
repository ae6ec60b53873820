use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Fixed production rate of the effects pipeline.
pub const TARGET_FPS: u32 = 30;

const FRAME_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    Office,
    Library,
    Home,
    Nature,
    Space,
    Classroom,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BackgroundSpec {
    #[default]
    None,
    Blur {
        amount: u8,
    },
    Scene(SceneKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FilterSpec {
    #[default]
    None,
    Brightness {
        intensity: f32,
    },
    Contrast {
        intensity: f32,
    },
    Sepia,
    Vintage,
    Cool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformSpec {
    pub background: BackgroundSpec,
    pub filter: FilterSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("frame transform failed: {0}")]
pub struct TransformError(pub String);

/// Raw frames off the capture device. Synchronous: the loop polls on its
/// own timer, a source with nothing ready returns `None`.
pub trait FrameSource: Send + Sync {
    fn capture(&self) -> Option<Frame>;
}

/// The external effects step. Consumed as an opaque function of one
/// frame; its implementation (segmentation, canvas work) lives elsewhere.
pub trait FrameTransform: Send + Sync {
    fn apply(
        &self,
        frame: Frame,
        background: &BackgroundSpec,
        filter: &FilterSpec,
    ) -> Result<Frame, TransformError>;
}

/// Run capture→transform at a fixed rate, independent of network and
/// mesh state. A failing transform never interrupts frame production:
/// the untransformed frame is substituted. The loop stops when the
/// returned receiver is dropped.
pub fn spawn_transform_loop(
    source: Arc<dyn FrameSource>,
    transform: Arc<dyn FrameTransform>,
    spec_rx: watch::Receiver<TransformSpec>,
) -> mpsc::Receiver<Frame> {
    let (out_tx, out_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1) / TARGET_FPS);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let Some(raw) = source.capture() else {
                continue;
            };
            let spec = spec_rx.borrow().clone();
            let frame = match transform.apply(raw.clone(), &spec.background, &spec.filter) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(error = %e, "transform failed, passing raw frame through");
                    raw
                }
            };

            match out_tx.try_send(frame) {
                Ok(()) => {}
                // Consumer lagging on live media: drop the frame.
                Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Closed(_)) => break,
            }
        }
    });

    out_rx
}
