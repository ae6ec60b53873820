mod chat;
mod ids;
mod signaling;

pub use chat::StoredMessage;
pub use ids::{ConnectionId, RoomId, TrackId, UserId};
pub use signaling::{ClientMessage, ServerMessage};
