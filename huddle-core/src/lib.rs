pub mod error;
pub mod model;

pub use error::{MediaError, RenegotiationError, SignalError};
pub use model::{
    ClientMessage, ConnectionId, RoomId, ServerMessage, StoredMessage, TrackId, UserId,
};
