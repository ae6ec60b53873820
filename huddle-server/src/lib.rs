pub mod registry;
pub mod relay;
pub mod store;
pub mod ws;

pub use registry::RoomRegistry;
pub use relay::Relay;
pub use store::{MemoryStore, MessageStore, ParticipantStore};
pub use ws::ws_handler;
