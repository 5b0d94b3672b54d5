use crate::error::SignalingError;
use async_trait::async_trait;
use teleconsult_core::RoomId;
use tokio::sync::mpsc;

/// An open, room-scoped message channel carrying JSON text frames.
///
/// `rx` yielding `None` means the remote end went away. Dropping `tx` closes
/// the channel from our side once queued frames are flushed.
pub struct SignalingChannel {
    pub tx: mpsc::UnboundedSender<String>,
    pub rx: mpsc::UnboundedReceiver<String>,
}

/// Opens channels to the room relay.
#[async_trait]
pub trait SignalingConnector: Send + Sync {
    async fn connect(&self, room_id: &RoomId) -> Result<SignalingChannel, SignalingError>;
}
