use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use teleconsult_core::TrackKind;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

impl FacingMode {
    pub fn opposite(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u32,
    pub ideal: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConstraints {
    pub facing_mode: FacingMode,
    pub width: Bounds,
    pub height: Bounds,
    pub frame_rate: Bounds,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::User,
            width: Bounds {
                min: 640,
                ideal: 1280,
                max: 1280,
            },
            height: Bounds {
                min: 480,
                ideal: 720,
                max: 720,
            },
            frame_rate: Bounds {
                min: 15,
                ideal: 30,
                max: 30,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// What to request from the devices. `None` skips that device entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: Option<AudioConstraints>,
    pub video: Option<VideoConstraints>,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: Some(AudioConstraints::default()),
            video: Some(VideoConstraints::default()),
        }
    }
}

struct TrackState {
    enabled: AtomicBool,
    live: AtomicBool,
}

/// A local capture track. Clones share the enabled/live flags and the
/// outgoing RTP track, so every peer link attached to it observes toggles.
#[derive(Clone)]
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    label: String,
    state: Arc<TrackState>,
    rtp: Arc<TrackLocalStaticSample>,
}

impl LocalTrack {
    pub(crate) fn new(kind: TrackKind, stream_id: &str) -> Self {
        let id = format!("{}-{}", kind, Uuid::new_v4());
        let mime_type = match kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let rtp = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            id.clone(),
            stream_id.to_owned(),
        ));

        Self {
            id,
            kind,
            label: String::new(),
            state: Arc::new(TrackState {
                enabled: AtomicBool::new(true),
                live: AtomicBool::new(true),
            }),
            rtp,
        }
    }

    pub(crate) fn with_label(mut self, label: String) -> Self {
        self.label = label;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    pub fn is_live(&self) -> bool {
        self.state.live.load(Ordering::SeqCst)
    }

    /// Flips `enabled` in place and returns the new value.
    pub(crate) fn toggle(&self) -> bool {
        !self.state.enabled.fetch_xor(true, Ordering::SeqCst)
    }

    /// Only the media service stops tracks.
    pub(crate) fn stop(&self) {
        self.state.live.store(false, Ordering::SeqCst);
    }

    pub fn sink(&self) -> TrackSink {
        TrackSink {
            state: self.state.clone(),
            rtp: self.rtp.clone(),
        }
    }

    pub(crate) fn rtp_track(&self) -> Arc<TrackLocalStaticSample> {
        self.rtp.clone()
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("enabled", &self.is_enabled())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Write end handed to a capture device. Frames are dropped while the track
/// is disabled or stopped.
#[derive(Clone)]
pub struct TrackSink {
    state: Arc<TrackState>,
    rtp: Arc<TrackLocalStaticSample>,
}

impl TrackSink {
    /// Returns `Ok(false)` when the frame was dropped.
    pub async fn write_frame(&self, data: Bytes, duration: Duration) -> Result<bool, webrtc::Error> {
        if !self.state.live.load(Ordering::SeqCst) || !self.state.enabled.load(Ordering::SeqCst) {
            return Ok(false);
        }

        self.rtp
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(true)
    }
}

/// The local audio/video pair owned by the media service.
#[derive(Debug, Clone)]
pub struct LocalMedia {
    pub stream_id: String,
    pub audio: Option<LocalTrack>,
    pub video: Option<LocalTrack>,
    pub facing: FacingMode,
}

impl LocalMedia {
    pub(crate) fn new(facing: FacingMode) -> Self {
        Self {
            stream_id: format!("local-{}", Uuid::new_v4()),
            audio: None,
            video: None,
            facing,
        }
    }

    pub fn tracks(&self) -> impl Iterator<Item = &LocalTrack> {
        self.audio.iter().chain(self.video.iter())
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio.as_ref().is_some_and(LocalTrack::is_enabled)
    }

    pub fn video_enabled(&self) -> bool {
        self.video.as_ref().is_some_and(LocalTrack::is_enabled)
    }
}
