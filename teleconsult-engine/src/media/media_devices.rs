use crate::error::MediaError;
use crate::media::{AudioConstraints, TrackSink, VideoConstraints};
use async_trait::async_trait;

/// Device-permission API supplied by the host platform.
///
/// Opening a device claims it exclusively until the returned handle is stopped.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open_microphone(
        &self,
        constraints: &AudioConstraints,
        sink: TrackSink,
    ) -> Result<Box<dyn CaptureDevice>, MediaError>;

    async fn open_camera(
        &self,
        constraints: &VideoConstraints,
        sink: TrackSink,
    ) -> Result<Box<dyn CaptureDevice>, MediaError>;
}

/// A claimed capture device pushing frames into its [`TrackSink`].
pub trait CaptureDevice: Send + Sync {
    fn label(&self) -> String;

    /// Releases the device. Must tolerate being called more than once.
    fn stop(&mut self);
}
