pub mod engine;
pub mod media;
pub mod mesh;
pub mod session;

pub use engine::{EngineError, MediaEngine, PeerConnection, SignalSink};
pub use mesh::{MeshCoordinator, MeshNotice, NegotiationState};
pub use session::{
    Session, SessionConfig, SessionHandle, SessionSink, SessionState, SignalConnection,
    SignalTransport, TransportEvent,
};
