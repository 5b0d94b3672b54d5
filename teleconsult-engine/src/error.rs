use teleconsult_core::{ParticipantId, RoomId, TrackKind};
use thiserror::Error;

/// Local device failures. Each kind needs a different user action, so they
/// are never folded into one generic error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("permission to use the {0} was denied")]
    PermissionDenied(DeviceKind),

    #[error("no {0} was found")]
    DeviceNotFound(DeviceKind),

    #[error("the {0} is in use by another application")]
    DeviceBusy(DeviceKind),

    #[error("local media has not been acquired")]
    NotAcquired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Camera,
    Microphone,
}

impl DeviceKind {
    pub fn for_track(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Audio => DeviceKind::Microphone,
            TrackKind::Video => DeviceKind::Camera,
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Camera => write!(f, "camera"),
            DeviceKind::Microphone => write!(f, "microphone"),
        }
    }
}

impl MediaError {
    /// What the user has to do before trying again.
    pub fn user_action(&self) -> &'static str {
        match self {
            MediaError::PermissionDenied(_) => {
                "Allow camera and microphone access in your device settings, then rejoin."
            }
            MediaError::DeviceNotFound(_) => "Connect a camera and microphone, then rejoin.",
            MediaError::DeviceBusy(_) => {
                "Close other apps that are using the camera or microphone, then rejoin."
            }
            MediaError::NotAcquired => "Join the consultation before changing devices.",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalingError {
    #[error("signaling connection lost: {0}")]
    ConnectionLost(String),

    #[error("signaling connection could not be re-established after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("failed to send '{kind}' message: {reason}")]
    SendFailed { kind: &'static str, reason: String },

    #[error("signaling channel is not connected")]
    NotConnected,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("failed to create offer for {participant_id}: {reason}")]
    OfferCreationFailed {
        participant_id: ParticipantId,
        reason: String,
    },

    #[error("failed to create answer for {participant_id}: {reason}")]
    AnswerCreationFailed {
        participant_id: ParticipantId,
        reason: String,
    },

    #[error("remote description from {participant_id} rejected: {reason}")]
    RemoteDescriptionRejected {
        participant_id: ParticipantId,
        reason: String,
    },

    #[error("no link exists for {0}")]
    UnknownParticipant(ParticipantId),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("call setup with {0} timed out")]
    NegotiationTimeout(ParticipantId),

    #[error("already in room {0}")]
    AlreadyInRoom(RoomId),

    #[error("not in a room")]
    NotJoined,

    #[error("join was cancelled by leave")]
    Cancelled,

    #[error("session task has stopped")]
    SessionClosed,
}
