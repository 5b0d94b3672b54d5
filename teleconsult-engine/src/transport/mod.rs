mod connection_wrapper;
mod peer_transport;
mod remote_track;
mod transport_config;
mod transport_event;

pub use connection_wrapper::*;
pub use peer_transport::*;
pub use remote_track::*;
pub use transport_config::*;
pub use transport_event::*;
