use crate::config::SessionConfig;
use crate::error::NegotiationError;
use crate::media::LocalMedia;
use crate::peer::{LinkState, PeerEvent, PeerLink};
use crate::transport::{
    LinkKey, PeerTransportFactory, TransportConfig, TransportEvent, TransportState,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use teleconsult_core::{ConnectionQualitySample, IceCandidate, ParticipantId, SessionDescription};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Distinct participants we buffer early candidates for before any link exists.
const MAX_EARLY_CANDIDATE_OWNERS: usize = 16;

/// Owns one [`PeerLink`] per remote participant and drives its negotiation.
///
/// All methods take `&mut self`, so steps for one link never interleave.
/// Transport callbacks arrive on the channel given to [`PeerController::new`]
/// and are fed back through [`PeerController::handle_transport_event`].
pub struct PeerController {
    links: HashMap<ParticipantId, PeerLink>,
    factory: Arc<dyn PeerTransportFactory>,
    transport_config: TransportConfig,
    local_media: Option<LocalMedia>,
    events_tx: mpsc::Sender<TransportEvent>,
    /// Candidates for participants we have no link for yet.
    early_candidates: HashMap<ParticipantId, VecDeque<IceCandidate>>,
    next_generation: u64,
    setup_timeout: Duration,
    max_pending_candidates: usize,
}

impl PeerController {
    pub fn new(
        factory: Arc<dyn PeerTransportFactory>,
        config: &SessionConfig,
        events_tx: mpsc::Sender<TransportEvent>,
    ) -> Self {
        Self {
            links: HashMap::new(),
            factory,
            transport_config: config.transport.clone(),
            local_media: None,
            events_tx,
            early_candidates: HashMap::new(),
            next_generation: 0,
            setup_timeout: config.setup_timeout(),
            max_pending_candidates: config.max_pending_candidates,
        }
    }

    /// Tracks attached to links created from now on.
    pub fn set_local_media(&mut self, media: Option<LocalMedia>) {
        self.local_media = media;
    }

    /// Creates the transport and registers the link before anything else is
    /// awaited, so a cancelled step always leaves it where `close_all` finds it.
    async fn open_link(&mut self, participant_id: &ParticipantId) -> anyhow::Result<&mut PeerLink> {
        self.next_generation += 1;
        let key = LinkKey {
            participant_id: participant_id.clone(),
            generation: self.next_generation,
        };

        let transport = self
            .factory
            .create(key.clone(), &self.transport_config, self.events_tx.clone())
            .await?;
        let mut link = PeerLink::new(key, transport, self.max_pending_candidates);
        if let Some(early) = self.early_candidates.remove(participant_id) {
            for candidate in early {
                link.queue_candidate(candidate);
            }
        }
        self.links.insert(participant_id.clone(), link);

        if let Some(media) = self.local_media.clone() {
            for track in media.tracks() {
                let attached = match self.links.get(participant_id) {
                    Some(link) => link.transport().add_track(track).await,
                    None => Ok(()),
                };
                if let Err(e) = attached {
                    self.close(participant_id).await;
                    return Err(e.context(format!("attaching local {} track", track.kind())));
                }
            }
        }

        let link = self
            .links
            .get_mut(participant_id)
            .ok_or_else(|| anyhow::anyhow!("link to {participant_id} vanished while opening"))?;
        info!(
            "Opened link to {} (generation {})",
            participant_id,
            link.generation()
        );
        Ok(link)
    }

    /// Builds a fresh link to `participant_id` and returns the offer to send.
    pub async fn create_offer(
        &mut self,
        participant_id: &ParticipantId,
    ) -> Result<SessionDescription, NegotiationError> {
        if self.links.contains_key(participant_id) {
            warn!("Replacing existing link to {}", participant_id);
            self.close(participant_id).await;
        }

        let offer_failed = |e: anyhow::Error| NegotiationError::OfferCreationFailed {
            participant_id: participant_id.clone(),
            reason: e.to_string(),
        };

        let setup_timeout = self.setup_timeout;
        let events_tx = self.events_tx.clone();
        let link = self.open_link(participant_id).await.map_err(offer_failed)?;
        link.transition(LinkState::Negotiating);
        link.start_setup_timer(setup_timeout, events_tx);

        let created = link.transport().create_offer().await;
        match created {
            Ok(offer) => Ok(offer),
            Err(e) => {
                self.close(participant_id).await;
                Err(offer_failed(e))
            }
        }
    }

    /// Applies a remote offer, creating the link if needed, and returns the answer.
    /// On failure the link is torn down.
    pub async fn handle_offer(
        &mut self,
        participant_id: &ParticipantId,
        offer: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        let reusable = self
            .links
            .get(participant_id)
            .is_some_and(|link| !link.state().is_terminal());

        let link = if reusable {
            match self.links.get_mut(participant_id) {
                Some(link) => link,
                None => return Err(NegotiationError::UnknownParticipant(participant_id.clone())),
            }
        } else {
            if let Some(stale) = self.links.get_mut(participant_id) {
                stale.close().await;
                self.links.remove(participant_id);
            }
            let setup_timeout = self.setup_timeout;
            let events_tx = self.events_tx.clone();
            let link = self.open_link(participant_id).await.map_err(|e| {
                NegotiationError::AnswerCreationFailed {
                    participant_id: participant_id.clone(),
                    reason: e.to_string(),
                }
            })?;
            link.transition(LinkState::Negotiating);
            link.start_setup_timer(setup_timeout, events_tx);
            link
        };

        let result = match link.apply_remote_description(offer).await {
            Err(e) => Err(NegotiationError::RemoteDescriptionRejected {
                participant_id: participant_id.clone(),
                reason: e.to_string(),
            }),
            Ok(()) => link.transport().create_answer().await.map_err(|e| {
                NegotiationError::AnswerCreationFailed {
                    participant_id: participant_id.clone(),
                    reason: e.to_string(),
                }
            }),
        };
        if result.is_err() {
            self.close(participant_id).await;
        }
        result
    }

    /// Applies a remote answer. A late or duplicate answer with no link is
    /// logged and ignored.
    pub async fn handle_answer(
        &mut self,
        participant_id: &ParticipantId,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let Some(link) = self.links.get_mut(participant_id) else {
            warn!("Answer from {} without a link, ignoring", participant_id);
            return Ok(());
        };

        let Err(e) = link.apply_remote_description(answer).await else {
            return Ok(());
        };
        self.close(participant_id).await;
        Err(NegotiationError::RemoteDescriptionRejected {
            participant_id: participant_id.clone(),
            reason: e.to_string(),
        })
    }

    /// Applies or buffers a remote candidate. Never fails.
    pub async fn handle_ice_candidate(&mut self, participant_id: &ParticipantId, candidate: IceCandidate) {
        if let Some(link) = self.links.get_mut(participant_id) {
            link.add_candidate(candidate).await;
            return;
        }

        if !self.early_candidates.contains_key(participant_id)
            && self.early_candidates.len() >= MAX_EARLY_CANDIDATE_OWNERS
        {
            warn!(
                "Early candidates buffered for {} unknown participants, dropping candidate from {}",
                self.early_candidates.len(),
                participant_id
            );
            return;
        }
        let queue = self.early_candidates.entry(participant_id.clone()).or_default();
        if queue.len() >= self.max_pending_candidates {
            warn!("Too many early candidates from {}, dropping", participant_id);
            return;
        }
        debug!("Buffering early candidate from {}", participant_id);
        queue.push_back(candidate);
    }

    pub async fn get_quality(&self, participant_id: &ParticipantId) -> ConnectionQualitySample {
        let Some(link) = self.links.get(participant_id) else {
            return ConnectionQualitySample::disconnected();
        };
        if link.state().is_terminal() {
            return ConnectionQualitySample::disconnected();
        }

        match link.stats().await {
            Ok(stats) => ConnectionQualitySample::classify(
                stats.round_trip_time_ms.unwrap_or(0.0),
                stats.packets_lost,
            ),
            Err(e) => {
                warn!("Failed to read stats for {}: {}", participant_id, e);
                ConnectionQualitySample::disconnected()
            }
        }
    }

    /// Closes and removes the link. Returns `false` if there was none.
    /// The link stays registered until its transport is closed.
    pub async fn close(&mut self, participant_id: &ParticipantId) -> bool {
        self.early_candidates.remove(participant_id);
        let Some(link) = self.links.get_mut(participant_id) else {
            return false;
        };
        link.close().await;
        self.links.remove(participant_id);
        info!("Closed link to {}", participant_id);
        true
    }

    pub async fn close_all(&mut self) {
        self.early_candidates.clear();
        for (participant_id, mut link) in self.links.drain() {
            link.close().await;
            debug!("Closed link to {}", participant_id);
        }
    }

    /// Participants with candidates waiting for a link.
    pub fn early_candidate_owners(&self) -> usize {
        self.early_candidates.len()
    }

    /// Folds a transport event into link state. Events from a replaced
    /// link generation are dropped.
    pub async fn handle_transport_event(&mut self, event: TransportEvent) -> Option<PeerEvent> {
        let key = event.key().clone();
        let participant_id = key.participant_id.clone();
        let Some(link) = self.links.get_mut(&participant_id) else {
            debug!("Transport event for unknown link {}", participant_id);
            return None;
        };
        if link.generation() != key.generation {
            debug!(
                "Stale event for {} (generation {}, current {})",
                participant_id,
                key.generation,
                link.generation()
            );
            return None;
        }

        match event {
            TransportEvent::StateChanged(_, TransportState::Connected) => {
                link.cancel_setup_timer();
                link.transition(LinkState::Connected);
                link.take_publishable_stream().map(PeerEvent::RemoteStreamReady)
            }
            TransportEvent::StateChanged(_, TransportState::New | TransportState::Connecting) => None,
            TransportEvent::StateChanged(_, state) => {
                let next = match state {
                    TransportState::Disconnected => LinkState::Disconnected,
                    TransportState::Failed => LinkState::Failed,
                    _ => LinkState::Closed,
                };
                info!("Link to {} ended: {:?}", participant_id, next);
                link.transition(next);
                self.close(&participant_id).await;
                Some(PeerEvent::LinkClosed {
                    participant_id,
                    state: next,
                })
            }
            TransportEvent::CandidateGenerated(_, candidate) => Some(PeerEvent::SendCandidate {
                to: participant_id,
                candidate,
            }),
            TransportEvent::TrackAdded(_, track) => {
                link.add_remote_track(track);
                link.take_publishable_stream().map(PeerEvent::RemoteStreamReady)
            }
            TransportEvent::SetupTimedOut(_) => {
                if link.state() == LinkState::Connected {
                    return None;
                }
                warn!("Call setup with {} timed out", participant_id);
                self.close(&participant_id).await;
                Some(PeerEvent::SetupTimedOut(participant_id))
            }
        }
    }

    pub fn link_state(&self, participant_id: &ParticipantId) -> Option<LinkState> {
        self.links.get(participant_id).map(PeerLink::state)
    }

    pub fn link_states(&self) -> Vec<(ParticipantId, LinkState)> {
        let mut states: Vec<_> = self
            .links
            .iter()
            .map(|(id, link)| (id.clone(), link.state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
