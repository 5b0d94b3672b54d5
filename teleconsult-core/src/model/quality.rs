//! Connection quality classification.
//!
//! - excellent: RTT <= 150ms and <= 20 packets lost
//! - good: RTT <= 300ms and <= 50 packets lost
//! - poor: anything worse
//! - disconnected: no link for the participant

use serde::{Deserialize, Serialize};

const EXCELLENT_MAX_LATENCY_MS: f64 = 150.0;
const EXCELLENT_MAX_PACKET_LOSS: u64 = 20;
const GOOD_MAX_LATENCY_MS: f64 = 300.0;
const GOOD_MAX_PACKET_LOSS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Poor,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionQualitySample {
    pub level: ConnectionQuality,
    pub latency_ms: f64,
    pub packet_loss: u64,
}

impl ConnectionQualitySample {
    pub fn classify(latency_ms: f64, packet_loss: u64) -> Self {
        let level = if latency_ms <= EXCELLENT_MAX_LATENCY_MS
            && packet_loss <= EXCELLENT_MAX_PACKET_LOSS
        {
            ConnectionQuality::Excellent
        } else if latency_ms <= GOOD_MAX_LATENCY_MS && packet_loss <= GOOD_MAX_PACKET_LOSS {
            ConnectionQuality::Good
        } else {
            ConnectionQuality::Poor
        };

        Self {
            level,
            latency_ms,
            packet_loss,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            level: ConnectionQuality::Disconnected,
            latency_ms: 0.0,
            packet_loss: 0,
        }
    }
}
