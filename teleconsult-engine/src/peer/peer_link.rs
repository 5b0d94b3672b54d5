use crate::transport::{
    LinkKey, PeerTransport, RemoteStream, RemoteTrack, TransportEvent, TransportStats,
};
use anyhow::Result;
use std::collections::VecDeque;
use std::time::Duration;
use teleconsult_core::{IceCandidate, ParticipantId, SessionDescription};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lifecycle of one peer link.
///
/// `new -> negotiating -> connected -> {disconnected, failed, closed}`;
/// any state may move to `closed`, and the last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    New,
    Negotiating,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl LinkState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LinkState::Disconnected | LinkState::Failed | LinkState::Closed
        )
    }

    fn can_move_to(self, next: LinkState) -> bool {
        use LinkState::*;
        match (self, next) {
            (Disconnected | Failed | Closed, _) => false,
            (_, Closed) => true,
            (New, Negotiating) => true,
            (Negotiating, Connected) => true,
            (New | Negotiating | Connected, Disconnected | Failed) => true,
            _ => false,
        }
    }
}

/// Transport, negotiation state and assembled remote stream for one remote
/// participant. Owned by the [`PeerController`](crate::peer::PeerController).
pub struct PeerLink {
    key: LinkKey,
    transport: Box<dyn PeerTransport>,
    state: LinkState,
    remote_description_set: bool,
    pending_candidates: VecDeque<IceCandidate>,
    max_pending: usize,
    remote_stream: RemoteStream,
    published: bool,
    setup_timer: Option<JoinHandle<()>>,
}

impl PeerLink {
    pub(crate) fn new(key: LinkKey, transport: Box<dyn PeerTransport>, max_pending: usize) -> Self {
        let remote_stream = RemoteStream::new(key.participant_id.clone());
        Self {
            key,
            transport,
            state: LinkState::New,
            remote_description_set: false,
            pending_candidates: VecDeque::new(),
            max_pending,
            remote_stream,
            published: false,
            setup_timer: None,
        }
    }

    pub fn key(&self) -> &LinkKey {
        &self.key
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.key.participant_id
    }

    pub fn generation(&self) -> u64 {
        self.key.generation
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn remote_stream(&self) -> &RemoteStream {
        &self.remote_stream
    }

    pub fn pending_candidate_count(&self) -> usize {
        self.pending_candidates.len()
    }

    pub(crate) fn transport(&self) -> &dyn PeerTransport {
        self.transport.as_ref()
    }

    /// Applies `next` if the state machine allows it.
    pub(crate) fn transition(&mut self, next: LinkState) -> bool {
        if self.state == next {
            return true;
        }
        if !self.state.can_move_to(next) {
            debug!(
                "Ignoring {:?} -> {:?} for {}",
                self.state, next, self.key.participant_id
            );
            return false;
        }
        debug!(
            "Link {} ({}): {:?} -> {:?}",
            self.key.participant_id, self.key.generation, self.state, next
        );
        self.state = next;
        true
    }

    /// Queues a candidate that arrived before the remote description.
    /// Returns `false` if the queue is full and the candidate was dropped.
    pub(crate) fn queue_candidate(&mut self, candidate: IceCandidate) -> bool {
        if self.pending_candidates.len() >= self.max_pending {
            warn!(
                "Candidate queue for {} is full, dropping candidate",
                self.key.participant_id
            );
            return false;
        }
        self.pending_candidates.push_back(candidate);
        true
    }

    /// Applies the remote description, then replays every queued candidate.
    pub(crate) async fn apply_remote_description(&mut self, desc: SessionDescription) -> Result<()> {
        self.transport.set_remote_description(desc).await?;
        self.remote_description_set = true;

        let pending = std::mem::take(&mut self.pending_candidates);
        if !pending.is_empty() {
            debug!(
                "Replaying {} early candidates for {}",
                pending.len(),
                self.key.participant_id
            );
        }
        for candidate in pending {
            self.apply_candidate(candidate).await;
        }
        Ok(())
    }

    /// Applies the candidate now, or queues it until the remote description is set.
    pub(crate) async fn add_candidate(&mut self, candidate: IceCandidate) {
        if self.remote_description_set {
            self.apply_candidate(candidate).await;
        } else {
            self.queue_candidate(candidate);
        }
    }

    async fn apply_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            debug!(
                "Discarding ICE candidate for {}: {}",
                self.key.participant_id, e
            );
        }
    }

    pub(crate) fn add_remote_track(&mut self, track: RemoteTrack) {
        self.remote_stream.add_track(track);
    }

    /// A stream is published once: when connected with at least one track.
    pub(crate) fn take_publishable_stream(&mut self) -> Option<RemoteStream> {
        if self.published
            || self.state != LinkState::Connected
            || self.remote_stream.tracks.is_empty()
        {
            return None;
        }
        self.published = true;
        Some(self.remote_stream.clone())
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub(crate) fn start_setup_timer(&mut self, timeout: Duration, events: mpsc::Sender<TransportEvent>) {
        self.cancel_setup_timer();
        let key = self.key.clone();
        self.setup_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = events.send(TransportEvent::SetupTimedOut(key)).await;
        }));
    }

    pub(crate) fn cancel_setup_timer(&mut self) {
        if let Some(timer) = self.setup_timer.take() {
            timer.abort();
        }
    }

    pub(crate) async fn stats(&self) -> Result<TransportStats> {
        self.transport.stats().await
    }

    /// Stops the timer and closes the transport. Local tracks are left alone.
    pub(crate) async fn close(&mut self) {
        self.cancel_setup_timer();
        self.pending_candidates.clear();
        self.transition(LinkState::Closed);
        if let Err(e) = self.transport.close().await {
            warn!(
                "Failed to close transport for {}: {}",
                self.key.participant_id, e
            );
        }
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.cancel_setup_timer();
    }
}
