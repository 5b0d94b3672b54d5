use crate::transport::RemoteTrack;
use teleconsult_core::{IceCandidate, ParticipantId};

/// Identifies one incarnation of a peer link. A participant that rejoins gets
/// a new generation, so late events from the old transport can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub participant_id: ParticipantId,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events a transport (or its setup timer) produces for the session loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Connection state reported by the underlying transport.
    StateChanged(LinkKey, TransportState),

    /// Local ICE candidate that must be relayed to the remote participant.
    CandidateGenerated(LinkKey, IceCandidate),

    /// A remote media track started arriving.
    TrackAdded(LinkKey, RemoteTrack),

    /// The link did not reach `connected` within the setup timeout.
    SetupTimedOut(LinkKey),
}

impl TransportEvent {
    pub fn key(&self) -> &LinkKey {
        match self {
            TransportEvent::StateChanged(key, _)
            | TransportEvent::CandidateGenerated(key, _)
            | TransportEvent::TrackAdded(key, _)
            | TransportEvent::SetupTimedOut(key) => key,
        }
    }
}
