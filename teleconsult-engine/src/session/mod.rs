mod session;
mod session_actor;
mod session_command;
mod session_event;
mod session_state;

pub use session::*;
pub use session_event::*;
