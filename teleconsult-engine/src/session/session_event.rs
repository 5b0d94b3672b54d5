use crate::error::SessionError;
use crate::peer::LinkState;
use crate::transport::RemoteStream;
use teleconsult_core::{ConnectionQualitySample, Participant, ParticipantId, RoomId};

/// Everything the application can observe about a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A remote participant entered the roster.
    ParticipantJoined(Participant),

    /// A remote participant left or their link ended.
    ParticipantLeft(ParticipantId),

    RemoteStream {
        participant_id: ParticipantId,
        stream: RemoteStream,
    },

    RemoteStreamRemoved(ParticipantId),

    /// Periodic sample, only when `quality_poll_interval_ms` is configured.
    QualitySampled {
        participant_id: ParticipantId,
        sample: ConnectionQualitySample,
    },

    /// `by` ended the call for everyone. The session leaves right after.
    CallEnded {
        by: ParticipantId,
    },

    /// Steady-state failure. The session keeps running.
    Error(SessionError),
}

/// Point-in-time view of a session, taken on the session task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub room_id: Option<RoomId>,
    pub local_id: Option<ParticipantId>,
    /// Sorted by id; includes the local participant.
    pub participants: Vec<Participant>,
    /// Participants with a published remote stream, sorted.
    pub remote_streams: Vec<ParticipantId>,
    pub links: Vec<(ParticipantId, LinkState)>,
    pub held_devices: usize,
}

impl SessionSnapshot {
    pub fn connected_links(&self) -> Vec<ParticipantId> {
        self.links
            .iter()
            .filter(|(_, state)| *state == LinkState::Connected)
            .map(|(id, _)| id.clone())
            .collect()
    }
}
