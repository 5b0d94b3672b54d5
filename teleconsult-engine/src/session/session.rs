use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::{LocalMedia, MediaDevices, MediaService};
use crate::peer::PeerController;
use crate::session::session_actor::SessionActor;
use crate::session::session_command::{Reply, SessionCommand};
use crate::session::session_state::SessionState;
use crate::session::{SessionEvent, SessionSnapshot};
use crate::signaling::SignalingConnector;
use crate::transport::{PeerTransportFactory, RemoteStream};
use std::sync::Arc;
use teleconsult_core::{
    ConnectionQualitySample, Participant, ParticipantId, ParticipantInfo, ParticipantRole, RoomId,
};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Handle to one consultation session. Cheap to clone; the session task
/// stops and leaves the room once the last handle is dropped.
///
/// ```ignore
/// let session = Session::new(config, devices, connector, Arc::new(RtcTransportFactory));
/// let mut events = session.subscribe();
/// session.join("consult-42", "patient-7", "Alex").await?;
/// while let Ok(event) = events.recv().await {
///     if let SessionEvent::RemoteStream { participant_id, stream } = event {
///         // render `stream`
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Session {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
    state: Arc<SessionState>,
    role: ParticipantRole,
}

impl Session {
    /// Spawns the session task. Must be called inside a tokio runtime.
    pub fn new(
        config: SessionConfig,
        devices: Arc<dyn MediaDevices>,
        connector: Arc<dyn SignalingConnector>,
        transports: Arc<dyn PeerTransportFactory>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let state = Arc::new(SessionState::default());

        let peers = PeerController::new(transports, &config, transport_tx);
        let role = config.role.clone();
        let actor = SessionActor::new(
            config,
            MediaService::new(devices),
            peers,
            connector,
            transport_rx,
            command_rx,
            state.clone(),
            events.clone(),
        );
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            events,
            state,
            role,
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }

    /// Acquires media, connects to the room and announces the local participant.
    ///
    /// Device and initial connection errors are returned here and leave
    /// nothing held. Joining the same room again is a no-op; joining another
    /// room first requires [`Session::leave`].
    pub async fn join(
        &self,
        room_id: impl Into<RoomId>,
        participant_id: impl Into<ParticipantId>,
        display_name: impl Into<String>,
    ) -> Result<(), SessionError> {
        let local = ParticipantInfo {
            user_id: participant_id.into(),
            user_name: display_name.into(),
            user_type: self.role.clone(),
        };
        let room_id = room_id.into();
        let cancel = self.state.join_token();

        self.request(|reply| SessionCommand::Join {
            room_id,
            local,
            cancel,
            reply,
        })
        .await?
    }

    /// Sends `user-left`, closes every link, releases devices and closes the
    /// channel. Aborts any join or negotiation step that is still running.
    /// Safe to call repeatedly and after a failed join.
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.state.cancel_in_flight();
        match self.request(|reply| SessionCommand::Leave { reply }).await {
            Err(SessionError::SessionClosed) => Ok(()),
            other => other,
        }
    }

    /// Tells everyone the call is over, then leaves.
    pub async fn end_call(&self) -> Result<(), SessionError> {
        self.state.cancel_in_flight();
        self.request(|reply| SessionCommand::EndCall { reply }).await
    }

    /// Returns the new enabled state, or `false` if there is no audio track.
    pub async fn toggle_audio(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::ToggleAudio { reply }).await
    }

    /// Returns the new enabled state, or `false` if there is no video track.
    pub async fn toggle_video(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::ToggleVideo { reply }).await
    }

    pub async fn switch_camera(&self) -> Result<LocalMedia, SessionError> {
        self.request(|reply| SessionCommand::SwitchCamera { reply })
            .await?
    }

    pub async fn quality(
        &self,
        participant_id: impl Into<ParticipantId>,
    ) -> Result<ConnectionQualitySample, SessionError> {
        let participant_id = participant_id.into();
        self.request(|reply| SessionCommand::Quality {
            participant_id,
            reply,
        })
        .await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Current roster, including the local participant.
    pub fn participants(&self) -> Vec<Participant> {
        self.state.sorted_participants()
    }

    pub fn remote_streams(&self) -> Vec<RemoteStream> {
        let mut streams: Vec<_> = self
            .state
            .remote_streams
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        streams.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        streams
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }
}
