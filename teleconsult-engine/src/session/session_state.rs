use crate::transport::RemoteStream;
use dashmap::DashMap;
use std::sync::{Mutex, PoisonError};
use teleconsult_core::{Participant, ParticipantId};
use tokio_util::sync::CancellationToken;

/// State readable from any handle. Only the session task writes the maps.
#[derive(Default)]
pub(crate) struct SessionState {
    pub participants: DashMap<ParticipantId, Participant>,
    pub remote_streams: DashMap<ParticipantId, RemoteStream>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl SessionState {
    /// Token for the current join, created if none is live.
    pub fn join_token(&self) -> CancellationToken {
        let mut slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(token) if !token.is_cancelled() => token.clone(),
            _ => {
                let token = CancellationToken::new();
                *slot = Some(token.clone());
                token
            }
        }
    }

    /// Aborts whatever join or negotiation step is in flight.
    pub fn cancel_in_flight(&self) {
        let token = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }

    pub fn sorted_participants(&self) -> Vec<Participant> {
        let mut participants: Vec<_> = self
            .participants
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        participants.sort_by(|a, b| a.id.cmp(&b.id));
        participants
    }

    pub fn sorted_stream_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self
            .remote_streams
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }
}
