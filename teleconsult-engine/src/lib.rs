//! Real-time consultation engine: local media, room signaling, one peer
//! link per remote participant, and the [`Session`] that ties them together.

pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::SessionConfig;
pub use error::{DeviceKind, MediaError, NegotiationError, SessionError, SignalingError};
pub use session::{Session, SessionEvent, SessionSnapshot};
