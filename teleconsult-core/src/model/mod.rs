mod media;
mod participant;
mod quality;
mod room;
mod signaling;

pub use media::TrackKind;
pub use participant::{Participant, ParticipantId, ParticipantInfo, ParticipantRole};
pub use quality::{ConnectionQuality, ConnectionQualitySample};
pub use room::RoomId;
pub use signaling::{
    DecodeError, IceCandidate, IceServerConfig, SdpType, SessionDescription, SignalKind,
    SignalMessage,
};
