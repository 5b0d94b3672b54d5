use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::MediaService;
use crate::peer::{LinkState, PeerController, PeerEvent};
use crate::session::session_command::SessionCommand;
use crate::session::session_state::SessionState;
use crate::session::{SessionEvent, SessionSnapshot};
use crate::signaling::{SignalingClient, SignalingConnector, SignalingEvent};
use crate::transport::TransportEvent;
use std::sync::Arc;
use teleconsult_core::{
    Participant, ParticipantId, ParticipantInfo, RoomId, SessionDescription, SignalKind,
};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the loop does after a signaling event was handled.
enum Flow {
    Continue,
    Leave,
}

struct JoinedRoom {
    room_id: RoomId,
    local: ParticipantInfo,
}

/// The session task. Sole writer of the roster and the remote-stream arena.
pub(crate) struct SessionActor {
    config: SessionConfig,
    media: MediaService,
    peers: PeerController,
    connector: Arc<dyn SignalingConnector>,
    signaling: Option<SignalingClient>,
    signaling_rx: Option<mpsc::UnboundedReceiver<SignalingEvent>>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    room: Option<JoinedRoom>,
    cancel: CancellationToken,
    quality_timer: Option<Interval>,
    state: Arc<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

async fn next_signal(rx: &mut Option<mpsc::UnboundedReceiver<SignalingEvent>>) -> Option<SignalingEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl SessionActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: SessionConfig,
        media: MediaService,
        peers: PeerController,
        connector: Arc<dyn SignalingConnector>,
        transport_rx: mpsc::Receiver<TransportEvent>,
        command_rx: mpsc::Receiver<SessionCommand>,
        state: Arc<SessionState>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            config,
            media,
            peers,
            connector,
            signaling: None,
            signaling_rx: None,
            transport_rx,
            command_rx,
            room: None,
            cancel: CancellationToken::new(),
            quality_timer: None,
            state,
            events,
        }
    }

    /// Main loop. Runs until every [`Session`](crate::Session) handle is dropped,
    /// then leaves the room.
    pub(crate) async fn run(mut self) {
        info!("Session event loop started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All session handles dropped. Shutting down session.");
                            break;
                        }
                    }
                }

                evt = next_signal(&mut self.signaling_rx) => {
                    match evt {
                        Some(e) => {
                            let cancel = self.cancel.clone();
                            let flow = tokio::select! {
                                biased;
                                _ = cancel.cancelled() => {
                                    debug!("Signaling event dropped by leave");
                                    Flow::Continue
                                }
                                flow = self.handle_signaling_event(e) => flow,
                            };
                            if let Flow::Leave = flow {
                                self.leave().await;
                            }
                        }
                        None => {
                            debug!("Signaling event stream ended");
                            self.signaling_rx = None;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    let Some(e) = evt else {
                        warn!("Transport channel closed unexpectedly");
                        break;
                    };
                    let cancel = self.cancel.clone();
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => debug!("Transport event dropped by leave"),
                        _ = self.handle_transport_event(e) => {}
                    }
                }

                _ = next_tick(&mut self.quality_timer) => {
                    self.sample_quality().await;
                }
            }
        }

        self.leave().await;
        info!("Session event loop finished");
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Join {
                room_id,
                local,
                cancel,
                reply,
            } => {
                self.cancel = cancel.clone();
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(SessionError::Cancelled),
                    r = self.join(room_id, local) => r,
                };
                let _ = reply.send(result);
            }

            SessionCommand::Leave { reply } => {
                self.leave().await;
                let _ = reply.send(());
            }

            SessionCommand::EndCall { reply } => {
                if let Some(signaling) = &self.signaling {
                    let _ = signaling.send(SignalKind::CallEnded, None);
                }
                self.leave().await;
                let _ = reply.send(());
            }

            SessionCommand::ToggleAudio { reply } => {
                let enabled = self.media.toggle_audio();
                self.update_local(|p| p.audio_enabled = enabled);
                let _ = reply.send(enabled);
            }

            SessionCommand::ToggleVideo { reply } => {
                let enabled = self.media.toggle_video();
                self.update_local(|p| p.video_enabled = enabled);
                let _ = reply.send(enabled);
            }

            SessionCommand::SwitchCamera { reply } => {
                let result = self.media.switch_camera().await.map_err(SessionError::from);
                if let Ok(media) = &result {
                    self.peers.set_local_media(Some(media.clone()));
                }
                let _ = reply.send(result);
            }

            SessionCommand::Quality {
                participant_id,
                reply,
            } => {
                let _ = reply.send(self.peers.get_quality(&participant_id).await);
            }

            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn join(&mut self, room_id: RoomId, local: ParticipantInfo) -> Result<(), SessionError> {
        if let Some(room) = &self.room {
            if room.room_id == room_id {
                debug!("Already in room {}", room_id);
                return Ok(());
            }
            return Err(SessionError::AlreadyInRoom(room.room_id.clone()));
        }

        info!("Joining room {} as {}", room_id, local.user_id);
        let media = self.media.acquire(&self.config.media).await?;
        self.peers.set_local_media(Some(media.clone()));

        let (mut signaling, signaling_rx) = SignalingClient::new(
            room_id.clone(),
            local.clone(),
            self.connector.clone(),
            self.config.reconnect,
        );
        if let Err(e) = signaling.connect().await {
            error!("Join of room {} failed: {}", room_id, e);
            self.peers.set_local_media(None);
            self.media.release();
            return Err(e.into());
        }

        let mut me = Participant::from_info(local.clone());
        me.audio_enabled = media.audio_enabled();
        me.video_enabled = media.video_enabled();
        self.state.participants.insert(me.id.clone(), me);

        self.quality_timer = self.config.quality_poll_interval().map(|period| {
            let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        });
        self.signaling = Some(signaling);
        self.signaling_rx = Some(signaling_rx);
        self.room = Some(JoinedRoom { room_id, local });
        Ok(())
    }

    /// Tears everything down. Safe to call in any state.
    async fn leave(&mut self) {
        self.state.cancel_in_flight();
        self.cancel.cancel();
        self.quality_timer = None;

        if let Some(mut signaling) = self.signaling.take() {
            signaling.leave_room().await;
        }
        self.signaling_rx = None;

        self.peers.close_all().await;
        for id in self.state.sorted_stream_ids() {
            self.state.remote_streams.remove(&id);
            self.emit(SessionEvent::RemoteStreamRemoved(id));
        }

        self.peers.set_local_media(None);
        self.media.release();
        self.state.participants.clear();

        if let Some(room) = self.room.take() {
            info!("Left room {}", room.room_id);
        }
    }

    fn local_id(&self) -> Option<&ParticipantId> {
        self.room.as_ref().map(|room| &room.local.user_id)
    }

    fn update_local(&self, apply: impl FnOnce(&mut Participant)) {
        if let Some(id) = self.local_id() {
            if let Some(mut me) = self.state.participants.get_mut(id) {
                apply(&mut *me);
            }
        }
    }

    fn send(&self, kind: SignalKind, to: Option<ParticipantId>) {
        let Some(signaling) = &self.signaling else {
            debug!("Not connected, dropping '{}'", kind.wire_type());
            return;
        };
        // Failures are logged by the client; the peer may still recover.
        let _ = signaling.send(kind, to);
    }

    async fn handle_signaling_event(&mut self, event: SignalingEvent) -> Flow {
        match event {
            SignalingEvent::Connected => {
                debug!("Signaling connected");
            }

            SignalingEvent::ParticipantJoined { info, directed } => {
                self.on_participant_joined(info, directed).await;
            }

            SignalingEvent::Offer { from, description } => {
                self.on_offer(from, description).await;
            }

            SignalingEvent::Answer { from, description } => {
                if let Err(e) = self.peers.handle_answer(&from, description).await {
                    warn!("Negotiation with {} failed: {}", from, e);
                    self.emit(SessionEvent::Error(e.into()));
                    self.remove_participant(&from).await;
                }
            }

            SignalingEvent::IceCandidate { from, candidate } => {
                self.peers.handle_ice_candidate(&from, candidate).await;
            }

            SignalingEvent::ParticipantLeft(id) => {
                info!("Participant {} left", id);
                self.remove_participant(&id).await;
            }

            SignalingEvent::CallEnded(by) => {
                info!("Call ended by {}", by);
                self.emit(SessionEvent::CallEnded { by });
                return Flow::Leave;
            }

            SignalingEvent::Reconnecting { attempt, delay } => {
                info!("Signaling reconnect attempt {} in {:?}", attempt, delay);
            }

            SignalingEvent::Error(e) => {
                self.emit(SessionEvent::Error(e.into()));
            }
        }
        Flow::Continue
    }

    async fn on_participant_joined(&mut self, info: ParticipantInfo, directed: bool) {
        if Some(&info.user_id) == self.local_id() {
            return;
        }

        if let Some(mut known) = self.state.participants.get_mut(&info.user_id) {
            known.display_name = info.user_name;
            known.role = info.user_type;
            return;
        }

        let id = info.user_id.clone();
        let participant = Participant::from_info(info);
        info!("Participant {} ({}) joined", id, participant.display_name);
        self.state.participants.insert(id.clone(), participant.clone());
        self.emit(SessionEvent::ParticipantJoined(participant));

        // The newcomer only listens; the member already in the room offers.
        if directed {
            return;
        }
        if let Some(room) = &self.room {
            self.send(SignalKind::UserJoined(room.local.clone()), Some(id.clone()));
        }

        match self.peers.create_offer(&id).await {
            Ok(offer) => self.send(SignalKind::Offer(offer), Some(id)),
            Err(e) => {
                warn!("Could not offer to {}: {}", id, e);
                self.emit(SessionEvent::Error(e.into()));
                self.remove_participant(&id).await;
            }
        }
    }

    async fn on_offer(&mut self, from: ParticipantId, offer: SessionDescription) {
        if !self.state.participants.contains_key(&from) {
            let participant = Participant::unannounced(from.clone());
            self.state.participants.insert(from.clone(), participant.clone());
            self.emit(SessionEvent::ParticipantJoined(participant));
        }

        match self.peers.handle_offer(&from, offer).await {
            Ok(answer) => self.send(SignalKind::Answer(answer), Some(from)),
            Err(e) => {
                warn!("Negotiation with {} failed: {}", from, e);
                self.emit(SessionEvent::Error(e.into()));
                self.remove_participant(&from).await;
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let Some(event) = self.peers.handle_transport_event(event).await else {
            return;
        };

        match event {
            PeerEvent::SendCandidate { to, candidate } => {
                self.send(SignalKind::IceCandidate(candidate), Some(to));
            }

            PeerEvent::RemoteStreamReady(stream) => {
                let participant_id = stream.participant_id.clone();
                info!(
                    "Remote stream from {} ({} tracks)",
                    participant_id,
                    stream.tracks.len()
                );
                self.state
                    .remote_streams
                    .insert(participant_id.clone(), stream.clone());
                self.emit(SessionEvent::RemoteStream {
                    participant_id,
                    stream,
                });
            }

            PeerEvent::LinkClosed {
                participant_id,
                state,
            } => {
                warn!("Link to {} is {:?}, removing participant", participant_id, state);
                self.remove_participant(&participant_id).await;
            }

            PeerEvent::SetupTimedOut(participant_id) => {
                self.emit(SessionEvent::Error(SessionError::NegotiationTimeout(
                    participant_id.clone(),
                )));
                self.remove_participant(&participant_id).await;
            }
        }
    }

    /// Closes the link, withdraws the stream and drops the participant,
    /// emitting an event for each piece that existed.
    async fn remove_participant(&mut self, id: &ParticipantId) {
        self.peers.close(id).await;

        if self.state.remote_streams.remove(id).is_some() {
            self.emit(SessionEvent::RemoteStreamRemoved(id.clone()));
        }
        if self.state.participants.remove(id).is_some() {
            self.emit(SessionEvent::ParticipantLeft(id.clone()));
        }
    }

    async fn sample_quality(&mut self) {
        for (participant_id, state) in self.peers.link_states() {
            if state != LinkState::Connected {
                continue;
            }
            let sample = self.peers.get_quality(&participant_id).await;
            self.emit(SessionEvent::QualitySampled {
                participant_id,
                sample,
            });
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            room_id: self.room.as_ref().map(|room| room.room_id.clone()),
            local_id: self.local_id().cloned(),
            participants: self.state.sorted_participants(),
            remote_streams: self.state.sorted_stream_ids(),
            links: self.peers.link_states(),
            held_devices: self.media.held_device_count(),
        }
    }
}
