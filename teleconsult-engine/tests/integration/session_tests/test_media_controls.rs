use teleconsult_engine::media::FacingMode;
use teleconsult_engine::{MediaError, SessionError};

use super::find_participant;
use crate::integration::{PATIENT, ROOM, create_test_peer, init_tracing};
use crate::utils::{MockRelay, MockTransportFactory};

#[tokio::test]
async fn test_toggles_flip_track_and_roster_flags() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    let patient = create_test_peer(&relay, &transports);

    // Nothing to toggle before join.
    assert!(!patient.session.toggle_audio().await.unwrap());

    patient.session.join(ROOM, PATIENT, "Alex").await.unwrap();
    let me = find_participant(&patient.session, PATIENT).unwrap();
    assert!(me.audio_enabled && me.video_enabled);

    assert!(!patient.session.toggle_audio().await.unwrap());
    assert!(!find_participant(&patient.session, PATIENT).unwrap().audio_enabled);

    assert!(patient.session.toggle_audio().await.unwrap());
    assert!(!patient.session.toggle_audio().await.unwrap());

    assert!(!patient.session.toggle_video().await.unwrap());
    let me = find_participant(&patient.session, PATIENT).unwrap();
    assert!(!me.audio_enabled);
    assert!(!me.video_enabled);

    // Toggling never touches the devices.
    assert_eq!(patient.devices.claimed(), 2);
    assert_eq!(patient.devices.opened(), 2);
}

#[tokio::test]
async fn test_switch_camera_reopens_only_the_camera() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    let patient = create_test_peer(&relay, &transports);

    let err = patient.session.switch_camera().await.unwrap_err();
    assert_eq!(err, SessionError::Media(MediaError::NotAcquired));

    patient.session.join(ROOM, PATIENT, "Alex").await.unwrap();
    let media = patient.session.switch_camera().await.unwrap();

    assert_eq!(media.facing, FacingMode::Environment);
    assert!(media.video.is_some());
    assert_eq!(patient.devices.claimed(), 2);
    assert_eq!(patient.devices.opened(), 3);

    let media = patient.session.switch_camera().await.unwrap();
    assert_eq!(media.facing, FacingMode::User);
    assert_eq!(patient.devices.opened(), 4);
}
