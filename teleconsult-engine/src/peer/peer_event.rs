use crate::peer::LinkState;
use crate::transport::RemoteStream;
use teleconsult_core::{IceCandidate, ParticipantId};

/// What the session has to act on after a transport event was applied.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// Local candidate to relay to `to`.
    SendCandidate {
        to: ParticipantId,
        candidate: IceCandidate,
    },

    /// The link is connected and carries at least one remote track.
    RemoteStreamReady(RemoteStream),

    /// The transport went `disconnected`/`failed`/`closed`; the link is gone.
    LinkClosed {
        participant_id: ParticipantId,
        state: LinkState,
    },

    /// Negotiation did not finish in time; the link is gone.
    SetupTimedOut(ParticipantId),
}
