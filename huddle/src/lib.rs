pub use huddle_core::{RoomId, UserId};

pub mod model {
    pub use huddle_core::model::*;
}

pub mod error {
    pub use huddle_core::error::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use huddle_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use huddle_client::*;
}
