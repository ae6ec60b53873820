mod coordinator;
mod link;

pub use coordinator::{MeshCoordinator, MeshNotice};
pub use link::{LinkHandle, NegotiationState};
