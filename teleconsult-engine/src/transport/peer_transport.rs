use crate::media::LocalTrack;
use crate::transport::{LinkKey, TransportConfig, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use teleconsult_core::{IceCandidate, SessionDescription};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransportStats {
    /// Round-trip time of the active candidate pair, if measured yet.
    pub round_trip_time_ms: Option<f64>,
    /// Cumulative packets lost as reported by the remote side.
    pub packets_lost: u64,
}

/// One negotiation/transport object, owned by a single peer link.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Attaches a local track for sending. The transport only reads from it.
    async fn add_track(&self, track: &LocalTrack) -> Result<()>;

    /// Creates an offer and applies it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Creates an answer and applies it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn stats(&self) -> Result<TransportStats>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait PeerTransportFactory: Send + Sync {
    /// Builds a transport whose callbacks report into `events`, tagged with `key`.
    async fn create(
        &self,
        key: LinkKey,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>>;
}
