use crate::model::participant::{ParticipantId, ParticipantInfo};
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Standard session-description object (`{ type, sdp }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
}

/// Closed set of negotiation messages relayed through the room channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalKind {
    Offer(SessionDescription),
    Answer(SessionDescription),
    IceCandidate(IceCandidate),
    UserJoined(ParticipantInfo),
    UserLeft,
    CallEnded,
}

impl SignalKind {
    pub fn wire_type(&self) -> &'static str {
        match self {
            SignalKind::Offer(_) => "offer",
            SignalKind::Answer(_) => "answer",
            SignalKind::IceCandidate(_) => "ice-candidate",
            SignalKind::UserJoined(_) => "user-joined",
            SignalKind::UserLeft => "user-left",
            SignalKind::CallEnded => "call-ended",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalMessage {
    pub room_id: RoomId,
    pub from: ParticipantId,
    pub to: Option<ParticipantId>,
    pub kind: SignalKind,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed signaling frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown signaling message type '{0}'")]
    UnknownType(String),

    #[error("'{0}' message is missing its data payload")]
    MissingPayload(&'static str),

    #[error("invalid '{kind}' payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    room_id: RoomId,
    from_user_id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to_user_id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl SignalMessage {
    pub fn new(room_id: RoomId, from: ParticipantId, kind: SignalKind) -> Self {
        Self {
            room_id,
            from,
            to: None,
            kind,
        }
    }

    pub fn to(mut self, to: ParticipantId) -> Self {
        self.to = Some(to);
        self
    }

    /// Whether this message should be handled by `local`: not sent by it and
    /// either broadcast or addressed to it.
    pub fn is_for(&self, local: &ParticipantId) -> bool {
        if &self.from == local {
            return false;
        }
        match &self.to {
            Some(to) => to == local,
            None => true,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let data = match &self.kind {
            SignalKind::Offer(desc) | SignalKind::Answer(desc) => Some(serde_json::to_value(desc)?),
            SignalKind::IceCandidate(candidate) => Some(serde_json::to_value(candidate)?),
            SignalKind::UserJoined(info) => Some(serde_json::to_value(info)?),
            SignalKind::UserLeft | SignalKind::CallEnded => None,
        };

        let envelope = Envelope {
            kind: self.kind.wire_type().to_owned(),
            room_id: self.room_id.clone(),
            from_user_id: self.from.clone(),
            to_user_id: self.to.clone(),
            data,
        };
        serde_json::to_string(&envelope)
    }

    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope = serde_json::from_str(text)?;

        let kind = match envelope.kind.as_str() {
            "offer" => SignalKind::Offer(payload("offer", envelope.data)?),
            "answer" => SignalKind::Answer(payload("answer", envelope.data)?),
            "ice-candidate" => SignalKind::IceCandidate(payload("ice-candidate", envelope.data)?),
            "user-joined" => SignalKind::UserJoined(payload("user-joined", envelope.data)?),
            "user-left" => SignalKind::UserLeft,
            "call-ended" => SignalKind::CallEnded,
            other => return Err(DecodeError::UnknownType(other.to_owned())),
        };

        Ok(Self {
            room_id: envelope.room_id,
            from: envelope.from_user_id,
            to: envelope.to_user_id,
            kind,
        })
    }
}

fn payload<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    data: Option<Value>,
) -> Result<T, DecodeError> {
    let data = data.ok_or(DecodeError::MissingPayload(kind))?;
    serde_json::from_value(data).map_err(|source| DecodeError::InvalidPayload { kind, source })
}
