use thiserror::Error;

/// Device acquisition failures. Every one of these surfaces as user
/// guidance rather than tearing down the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("camera/microphone access denied; allow permissions and retry")]
    PermissionDenied,
    #[error("no capture device found; connect a camera or microphone")]
    DeviceNotFound,
    #[error("capture device is already in use by another application")]
    DeviceBusy,
    #[error("requested capture constraints cannot be satisfied")]
    ConstraintsUnsatisfiable,
}

/// Control-plane faults. None of these close the signaling connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("message references an unknown peer link: {0}")]
    ProtocolViolation(String),
    #[error("signaling transport is closed")]
    TransportClosed,
    #[error("malformed signaling message: {0}")]
    Malformed(String),
}

/// In-place track replacement was rejected by the underlying connection.
/// Retried once; after that the link keeps running with degraded video.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("track replacement rejected: {reason}")]
pub struct RenegotiationError {
    pub reason: String,
}
