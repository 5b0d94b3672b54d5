use crate::error::{DeviceKind, MediaError};
use crate::media::{CaptureDevice, LocalMedia, LocalTrack, MediaConstraints, MediaDevices};
use std::sync::Arc;
use teleconsult_core::TrackKind;
use tracing::{debug, info, warn};

/// Devices and tracks of one acquisition. Dropping it stops everything,
/// so an early return can never leak a claimed device.
struct HeldMedia {
    media: LocalMedia,
    constraints: MediaConstraints,
    microphone: Option<Box<dyn CaptureDevice>>,
    camera: Option<Box<dyn CaptureDevice>>,
}

impl HeldMedia {
    fn device_count(&self) -> usize {
        usize::from(self.microphone.is_some()) + usize::from(self.camera.is_some())
    }
}

impl Drop for HeldMedia {
    fn drop(&mut self) {
        for track in self.media.tracks() {
            track.stop();
        }
        if let Some(mut microphone) = self.microphone.take() {
            microphone.stop();
        }
        if let Some(mut camera) = self.camera.take() {
            camera.stop();
        }
    }
}

/// Owns the local camera/microphone handles and the tracks fed by them.
pub struct MediaService {
    devices: Arc<dyn MediaDevices>,
    held: Option<HeldMedia>,
}

impl MediaService {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            held: None,
        }
    }

    /// Claims microphone then camera. Returns the already-held media if called twice.
    pub async fn acquire(&mut self, constraints: &MediaConstraints) -> Result<LocalMedia, MediaError> {
        if let Some(held) = &self.held {
            debug!("Local media already acquired ({})", held.media.stream_id);
            return Ok(held.media.clone());
        }

        let facing = constraints
            .video
            .as_ref()
            .map(|v| v.facing_mode)
            .unwrap_or_default();
        let mut held = HeldMedia {
            media: LocalMedia::new(facing),
            constraints: constraints.clone(),
            microphone: None,
            camera: None,
        };

        if let Some(audio) = &constraints.audio {
            let track = LocalTrack::new(TrackKind::Audio, &held.media.stream_id);
            let device = self.devices.open_microphone(audio, track.sink()).await?;
            held.media.audio = Some(track.with_label(device.label()));
            held.microphone = Some(device);
        }

        if let Some(video) = &constraints.video {
            let track = LocalTrack::new(TrackKind::Video, &held.media.stream_id);
            let device = match self.devices.open_camera(video, track.sink()).await {
                Ok(device) => device,
                Err(e) => {
                    warn!("Camera acquisition failed, releasing microphone: {}", e);
                    return Err(e);
                }
            };
            held.media.video = Some(track.with_label(device.label()));
            held.camera = Some(device);
        }

        info!(
            "Acquired local media {} ({} devices)",
            held.media.stream_id,
            held.device_count()
        );
        let media = held.media.clone();
        self.held = Some(held);
        Ok(media)
    }

    pub fn toggle_audio(&mut self) -> bool {
        self.toggle(TrackKind::Audio)
    }

    pub fn toggle_video(&mut self) -> bool {
        self.toggle(TrackKind::Video)
    }

    fn toggle(&mut self, kind: TrackKind) -> bool {
        let Some(held) = &self.held else {
            return false;
        };
        let track = match kind {
            TrackKind::Audio => held.media.audio.as_ref(),
            TrackKind::Video => held.media.video.as_ref(),
        };
        let Some(track) = track else {
            return false;
        };

        let enabled = track.toggle();
        debug!("{} track {} enabled={}", kind, track.id(), enabled);
        enabled
    }

    /// Re-opens the camera with the opposite facing mode. The outgoing video
    /// track is kept, so attached peer links need no renegotiation; the
    /// microphone is never touched.
    pub async fn switch_camera(&mut self) -> Result<LocalMedia, MediaError> {
        let held = self.held.as_mut().ok_or(MediaError::NotAcquired)?;
        let Some(track) = held.media.video.clone() else {
            return Err(MediaError::DeviceNotFound(DeviceKind::Camera));
        };

        let previous = held.media.facing;
        let mut constraints = held.constraints.video.clone().unwrap_or_default();
        constraints.facing_mode = previous.opposite();

        if let Some(mut camera) = held.camera.take() {
            camera.stop();
        }

        match self.devices.open_camera(&constraints, track.sink()).await {
            Ok(device) => {
                info!("Switched camera to {:?}", constraints.facing_mode);
                held.media.facing = constraints.facing_mode;
                held.media.video = Some(track.with_label(device.label()));
                held.constraints.video = Some(constraints);
                held.camera = Some(device);
                Ok(held.media.clone())
            }
            Err(e) => {
                warn!("Camera switch failed ({}), restoring {:?} camera", e, previous);
                constraints.facing_mode = previous;
                match self.devices.open_camera(&constraints, track.sink()).await {
                    Ok(device) => held.camera = Some(device),
                    Err(restore_err) => {
                        warn!("Could not restore camera: {}", restore_err);
                        track.stop();
                        held.media.video = None;
                    }
                }
                Err(e)
            }
        }
    }

    /// Stops all tracks and frees the devices. Safe to call repeatedly.
    pub fn release(&mut self) {
        match self.held.take() {
            Some(held) => {
                info!("Releasing local media {}", held.media.stream_id);
                drop(held);
            }
            None => debug!("Local media already released"),
        }
    }

    pub fn local_media(&self) -> Option<LocalMedia> {
        self.held.as_ref().map(|held| held.media.clone())
    }

    pub fn held_device_count(&self) -> usize {
        self.held.as_ref().map_or(0, HeldMedia::device_count)
    }
}

impl Drop for MediaService {
    fn drop(&mut self) {
        self.release();
    }
}
