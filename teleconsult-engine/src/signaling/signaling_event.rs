use crate::error::SignalingError;
use std::time::Duration;
use teleconsult_core::{IceCandidate, ParticipantId, ParticipantInfo, SessionDescription};

/// Decoded, addressed-to-us signaling traffic plus channel lifecycle.
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    /// The channel is open (initially or after a reconnect) and `user-joined` was sent.
    Connected,

    Offer {
        from: ParticipantId,
        description: SessionDescription,
    },

    Answer {
        from: ParticipantId,
        description: SessionDescription,
    },

    IceCandidate {
        from: ParticipantId,
        candidate: IceCandidate,
    },

    /// `directed` is set when the announcement was addressed to us, i.e. an
    /// existing member introducing itself to a newcomer.
    ParticipantJoined {
        info: ParticipantInfo,
        directed: bool,
    },

    ParticipantLeft(ParticipantId),

    CallEnded(ParticipantId),

    Reconnecting {
        attempt: u32,
        delay: Duration,
    },

    Error(SignalingError),
}
