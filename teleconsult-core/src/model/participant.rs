use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    #[default]
    Patient,
    Doctor,
    #[serde(other)]
    Unknown,
}

/// Payload of a `user-joined` announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user_id: ParticipantId,
    pub user_name: String,
    #[serde(default)]
    pub user_type: ParticipantRole,
}

/// A member of the room as seen by the local session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub role: ParticipantRole,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn from_info(info: ParticipantInfo) -> Self {
        Self {
            id: info.user_id,
            display_name: info.user_name,
            role: info.user_type,
            audio_enabled: true,
            video_enabled: true,
            joined_at: Utc::now(),
        }
    }

    /// A participant we only know from negotiation traffic, before any introduction.
    pub fn unannounced(id: ParticipantId) -> Self {
        Self {
            display_name: id.to_string(),
            id,
            role: ParticipantRole::Unknown,
            audio_enabled: true,
            video_enabled: true,
            joined_at: Utc::now(),
        }
    }

    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            user_id: self.id.clone(),
            user_name: self.display_name.clone(),
            user_type: self.role.clone(),
        }
    }
}
