mod local_media;
mod media_devices;
mod media_service;

pub use local_media::*;
pub use media_devices::*;
pub use media_service::*;
