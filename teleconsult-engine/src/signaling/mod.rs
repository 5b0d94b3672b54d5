mod reconnect_policy;
mod signaling_channel;
mod signaling_client;
mod signaling_event;
mod ws_connector;

pub use reconnect_policy::*;
pub use signaling_channel::*;
pub use signaling_client::*;
pub use signaling_event::*;
pub use ws_connector::*;
