use crate::media::MediaConstraints;
use crate::signaling::ReconnectPolicy;
use crate::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use teleconsult_core::ParticipantRole;

/// Everything a [`Session`](crate::Session) needs besides its collaborators.
/// Missing fields in a config document take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Role announced in `user-joined`.
    pub role: ParticipantRole,
    pub media: MediaConstraints,
    pub transport: TransportConfig,
    pub reconnect: ReconnectPolicy,
    /// Time a link may spend negotiating before it is torn down.
    pub setup_timeout_ms: u64,
    /// Periodic quality sampling for every link; off when `None`.
    pub quality_poll_interval_ms: Option<u64>,
    /// Per-participant bound on ICE candidates queued before the remote description.
    pub max_pending_candidates: usize,
    /// Buffer of the session event bus. Slow subscribers lag past this.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: ParticipantRole::default(),
            media: MediaConstraints::default(),
            transport: TransportConfig::default(),
            reconnect: ReconnectPolicy::default(),
            setup_timeout_ms: 30_000,
            quality_poll_interval_ms: None,
            max_pending_candidates: 64,
            event_capacity: 256,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_millis(self.setup_timeout_ms)
    }

    pub fn quality_poll_interval(&self) -> Option<Duration> {
        self.quality_poll_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
