use crate::error::SignalingError;
use crate::signaling::{ReconnectPolicy, SignalingConnector, SignalingEvent};
use std::sync::{Arc, Mutex};
use teleconsult_core::{ParticipantId, ParticipantInfo, RoomId, SignalKind, SignalMessage};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

struct ClientShared {
    /// Write end of the currently open channel, if any.
    outgoing: Mutex<Option<mpsc::UnboundedSender<String>>>,
    state: watch::Sender<ConnectionState>,
}

impl ClientShared {
    fn install(&self, tx: mpsc::UnboundedSender<String>) {
        if let Ok(mut outgoing) = self.outgoing.lock() {
            *outgoing = Some(tx);
        }
        self.state.send_replace(ConnectionState::Connected);
    }

    fn uninstall(&self, next: ConnectionState) {
        if let Ok(mut outgoing) = self.outgoing.lock() {
            outgoing.take();
        }
        self.state.send_replace(next);
    }

    fn push(&self, kind: &'static str, text: String) -> Result<(), SignalingError> {
        let outgoing = self.outgoing.lock().map_err(|_| SignalingError::SendFailed {
            kind,
            reason: "channel lock poisoned".into(),
        })?;
        let Some(tx) = outgoing.as_ref() else {
            return Err(SignalingError::NotConnected);
        };
        tx.send(text).map_err(|_| SignalingError::SendFailed {
            kind,
            reason: "channel closed".into(),
        })
    }
}

/// Everything the background task needs to pump and re-open the channel.
#[derive(Clone)]
struct Link {
    room_id: RoomId,
    local: ParticipantInfo,
    connector: Arc<dyn SignalingConnector>,
    policy: ReconnectPolicy,
    shared: Arc<ClientShared>,
    events: mpsc::UnboundedSender<SignalingEvent>,
}

impl Link {
    fn send(&self, kind: SignalKind, to: Option<ParticipantId>) -> Result<(), SignalingError> {
        let wire_type = kind.wire_type();
        let msg = SignalMessage {
            room_id: self.room_id.clone(),
            from: self.local.user_id.clone(),
            to,
            kind,
        };
        let text = msg.to_json().map_err(|e| SignalingError::SendFailed {
            kind: wire_type,
            reason: e.to_string(),
        })?;
        self.shared.push(wire_type, text)
    }

    fn announce(&self) {
        if let Err(e) = self.send(SignalKind::UserJoined(self.local.clone()), None) {
            warn!("Failed to announce {} in room {}: {}", self.local.user_id, self.room_id, e);
        }
    }

    fn emit(&self, event: SignalingEvent) {
        let _ = self.events.send(event);
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<String>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.pump(&mut rx) => {}
            }

            warn!(
                "{}",
                SignalingError::ConnectionLost(format!("room {} channel closed", self.room_id))
            );
            self.shared.uninstall(ConnectionState::Reconnecting);

            match self.reconnect(&shutdown).await {
                Some(next) => rx = next,
                None => break,
            }
        }
        debug!("Signaling task for room {} finished", self.room_id);
    }

    async fn pump(&self, rx: &mut mpsc::UnboundedReceiver<String>) {
        while let Some(text) = rx.recv().await {
            self.dispatch(&text);
        }
    }

    async fn reconnect(
        &self,
        shutdown: &CancellationToken,
    ) -> Option<mpsc::UnboundedReceiver<String>> {
        for attempt in 1..=self.policy.max_attempts {
            let delay = self.policy.delay_for(attempt)?;
            info!(
                "Reconnecting to room {} in {:?} (attempt {}/{})",
                self.room_id, delay, attempt, self.policy.max_attempts
            );
            self.emit(SignalingEvent::Reconnecting { attempt, delay });

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return None,
                result = self.connector.connect(&self.room_id) => result,
            };

            match result {
                Ok(channel) => {
                    info!("Reconnected to room {} on attempt {}", self.room_id, attempt);
                    self.shared.install(channel.tx);
                    self.announce();
                    self.emit(SignalingEvent::Connected);
                    return Some(channel.rx);
                }
                Err(e) => warn!("Reconnect attempt {} failed: {}", attempt, e),
            }
        }

        let err = SignalingError::ReconnectExhausted {
            attempts: self.policy.max_attempts,
        };
        error!("{}", err);
        self.shared.uninstall(ConnectionState::Closed);
        self.emit(SignalingEvent::Error(err));
        None
    }

    fn dispatch(&self, text: &str) {
        let msg = match SignalMessage::from_json(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Dropping signaling frame: {}", e);
                return;
            }
        };

        if msg.room_id != self.room_id {
            debug!("Ignoring message for room {}", msg.room_id);
            return;
        }
        if !msg.is_for(&self.local.user_id) {
            return;
        }

        let directed = msg.to.is_some();
        let from = msg.from;
        let event = match msg.kind {
            SignalKind::Offer(description) => SignalingEvent::Offer { from, description },
            SignalKind::Answer(description) => SignalingEvent::Answer { from, description },
            SignalKind::IceCandidate(candidate) => SignalingEvent::IceCandidate { from, candidate },
            SignalKind::UserJoined(mut info) => {
                if info.user_id != from {
                    warn!("user-joined from {} carries id {}", from, info.user_id);
                    info.user_id = from;
                }
                SignalingEvent::ParticipantJoined { info, directed }
            }
            SignalKind::UserLeft => SignalingEvent::ParticipantLeft(from),
            SignalKind::CallEnded => SignalingEvent::CallEnded(from),
        };
        self.emit(event);
    }
}

/// Persistent, reconnecting channel to one room's relay.
pub struct SignalingClient {
    link: Link,
    task: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl SignalingClient {
    /// Returns the client and the stream of events it will produce.
    pub fn new(
        room_id: RoomId,
        local: ParticipantInfo,
        connector: Arc<dyn SignalingConnector>,
        policy: ReconnectPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<SignalingEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        let client = Self {
            link: Link {
                room_id,
                local,
                connector,
                policy,
                shared: Arc::new(ClientShared {
                    outgoing: Mutex::new(None),
                    state,
                }),
                events,
            },
            task: None,
            shutdown: CancellationToken::new(),
        };
        (client, events_rx)
    }

    pub fn room_id(&self) -> &RoomId {
        &self.link.room_id
    }

    pub fn state(&self) -> ConnectionState {
        *self.link.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.link.shared.state.subscribe()
    }

    /// Opens the channel and announces the local participant. The initial
    /// connect is not retried; its error goes straight to the caller.
    pub async fn connect(&mut self) -> Result<(), SignalingError> {
        if self.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        self.link
            .shared
            .state
            .send_replace(ConnectionState::Connecting);
        let channel = match self.link.connector.connect(&self.link.room_id).await {
            Ok(channel) => channel,
            Err(e) => {
                error!("Failed to connect to room {}: {}", self.link.room_id, e);
                self.link.shared.uninstall(ConnectionState::Disconnected);
                return Err(e);
            }
        };
        info!("Signaling connected to room {}", self.link.room_id);

        self.link.shared.install(channel.tx);
        self.link.announce();
        self.link.emit(SignalingEvent::Connected);

        self.shutdown = CancellationToken::new();
        self.task = Some(tokio::spawn(
            self.link.clone().run(channel.rx, self.shutdown.clone()),
        ));
        Ok(())
    }

    /// Sends a message to the room, or to one participant when `to` is set.
    /// Delivery is not guaranteed; failures are logged and returned.
    pub fn send(&self, kind: SignalKind, to: Option<ParticipantId>) -> Result<(), SignalingError> {
        let wire_type = kind.wire_type();
        self.link.send(kind, to).inspect_err(|e| {
            warn!("Signaling send of '{}' failed: {}", wire_type, e);
        })
    }

    /// Announces departure and closes without reconnecting.
    pub async fn leave_room(&mut self) {
        if self.state() == ConnectionState::Connected {
            let _ = self.send(SignalKind::UserLeft, None);
        }
        self.close().await;
    }

    /// Stops the background task, any pending reconnect and the channel.
    pub async fn close(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
            info!("Signaling for room {} closed", self.link.room_id);
        }
        self.link.shared.uninstall(ConnectionState::Closed);
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
