mod peer_controller;
mod peer_event;
mod peer_link;

pub use peer_controller::*;
pub use peer_event::*;
pub use peer_link::*;
