use crate::error::SignalingError;
use crate::signaling::{SignalingChannel, SignalingConnector};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use teleconsult_core::RoomId;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

/// Connects to the relay's `…/ws?room_id=<roomId>` WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn endpoint(&self, room_id: &RoomId) -> Result<Url, SignalingError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SignalingError::ConnectionLost(format!("invalid relay url: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| SignalingError::ConnectionLost("relay url cannot have a path".into()))?
            .pop_if_empty()
            .push("ws");
        url.query_pairs_mut().append_pair("room_id", room_id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl SignalingConnector for WsConnector {
    async fn connect(&self, room_id: &RoomId) -> Result<SignalingChannel, SignalingError> {
        let url = self.endpoint(room_id)?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| SignalingError::ConnectionLost(e.to_string()))?;
        info!("Signaling WebSocket open: {}", url);

        let (mut sender, mut receiver) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            let mut send_task = tokio::spawn(async move {
                while let Some(text) = out_rx.recv().await {
                    if sender.send(Message::text(text)).await.is_err() {
                        return;
                    }
                }
                let _ = sender.send(Message::Close(None)).await;
            });

            let mut recv_task = tokio::spawn(async move {
                while let Some(frame) = receiver.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            if in_tx.send(text.to_string()).is_err() {
                                break;
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Signaling WebSocket error: {}", e);
                            break;
                        }
                    }
                }
            });

            tokio::select! {
                _ = (&mut send_task) => recv_task.abort(),
                _ = (&mut recv_task) => send_task.abort(),
            };
            debug!("Signaling WebSocket closed");
        });

        Ok(SignalingChannel {
            tx: out_tx,
            rx: in_rx,
        })
    }
}
