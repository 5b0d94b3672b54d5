use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use teleconsult_core::{ParticipantId, TrackKind};

/// Source of media payloads for one remote track.
#[async_trait]
pub trait TrackReader: Send + Sync {
    /// Next payload, or `None` once the track has ended.
    async fn read_packet(&self) -> Option<Bytes>;
}

#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
    pub stream_id: String,
    reader: Arc<dyn TrackReader>,
}

impl RemoteTrack {
    pub fn new(id: String, kind: TrackKind, stream_id: String, reader: Arc<dyn TrackReader>) -> Self {
        Self {
            id,
            kind,
            stream_id,
            reader,
        }
    }

    pub async fn read_packet(&self) -> Option<Bytes> {
        self.reader.read_packet().await
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

/// The media a remote participant is sending us.
#[derive(Debug, Clone)]
pub struct RemoteStream {
    pub participant_id: ParticipantId,
    pub tracks: Vec<RemoteTrack>,
}

impl RemoteStream {
    pub fn new(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            tracks: Vec::new(),
        }
    }

    pub fn track(&self, kind: TrackKind) -> Option<&RemoteTrack> {
        self.tracks.iter().find(|t| t.kind == kind)
    }

    /// Adds a track, replacing one with the same id.
    pub(crate) fn add_track(&mut self, track: RemoteTrack) {
        self.tracks.retain(|t| t.id != track.id);
        self.tracks.push(track);
    }
}
