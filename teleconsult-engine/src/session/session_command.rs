use crate::error::SessionError;
use crate::media::LocalMedia;
use crate::session::SessionSnapshot;
use teleconsult_core::{ConnectionQualitySample, ParticipantId, ParticipantInfo, RoomId};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Requests from [`Session`](crate::Session) handles to the session task.
pub(crate) enum SessionCommand {
    Join {
        room_id: RoomId,
        local: ParticipantInfo,
        /// Cancelled by `leave()` to abort whatever step is in flight.
        cancel: CancellationToken,
        reply: Reply<Result<(), SessionError>>,
    },
    Leave {
        reply: Reply<()>,
    },
    EndCall {
        reply: Reply<()>,
    },
    ToggleAudio {
        reply: Reply<bool>,
    },
    ToggleVideo {
        reply: Reply<bool>,
    },
    SwitchCamera {
        reply: Reply<Result<LocalMedia, SessionError>>,
    },
    Quality {
        participant_id: ParticipantId,
        reply: Reply<ConnectionQualitySample>,
    },
    Snapshot {
        reply: Reply<SessionSnapshot>,
    },
}
