mod local;
mod pipeline;
mod source;
mod track;

pub use local::{LocalMedia, LocalMediaState, MediaNotice, VideoPublisher};
pub use pipeline::{
    BackgroundSpec, FilterSpec, Frame, FrameSource, FrameTransform, SceneKind, TransformError,
    TransformSpec, spawn_transform_loop,
};
pub use source::{CapturedMedia, MediaConstraints, MediaSource};
pub use track::{MediaTrack, TrackKind, TrackSource};
