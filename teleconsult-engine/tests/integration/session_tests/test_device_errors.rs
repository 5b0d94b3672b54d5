use teleconsult_core::RoomId;
use teleconsult_engine::{DeviceKind, MediaError, SessionError, SignalingError};

use crate::integration::{PATIENT, ROOM, create_test_peer, init_tracing};
use crate::utils::{MockRelay, MockTransportFactory};

#[tokio::test]
async fn test_busy_camera_fails_join_and_holds_nothing() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    let patient = create_test_peer(&relay, &transports);
    patient.devices.hold_elsewhere(DeviceKind::Camera);

    let err = patient.session.join(ROOM, PATIENT, "Alex").await.unwrap_err();
    assert_eq!(err, SessionError::Media(MediaError::DeviceBusy(DeviceKind::Camera)));

    // The microphone was opened first and must have been released.
    assert_eq!(patient.devices.opened(), 1);
    assert_eq!(patient.devices.claimed(), 0);
    assert_eq!(relay.connect_attempts(), 0);
    assert_eq!(relay.members(&RoomId::from(ROOM)), 0);

    assert!(patient.session.leave().await.is_ok());
    let snapshot = patient.session.snapshot().await.unwrap();
    assert_eq!(snapshot.room_id, None);
    assert_eq!(snapshot.held_devices, 0);
}

#[tokio::test]
async fn test_denied_permission_is_reported_distinctly() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    let patient = create_test_peer(&relay, &transports);
    patient.devices.deny_permission();

    let err = patient.session.join(ROOM, PATIENT, "Alex").await.unwrap_err();
    assert_eq!(
        err,
        SessionError::Media(MediaError::PermissionDenied(DeviceKind::Microphone))
    );
    assert_eq!(patient.devices.claimed(), 0);
}

#[tokio::test]
async fn test_initial_connect_failure_releases_devices() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    let patient = create_test_peer(&relay, &transports);
    relay.refuse_connections(1);

    let err = patient.session.join(ROOM, PATIENT, "Alex").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Signaling(SignalingError::ConnectionLost(_))
    ));
    assert_eq!(patient.devices.claimed(), 0);
    assert_eq!(patient.session.snapshot().await.unwrap().room_id, None);

    // No automatic retry after a failed first connection.
    assert_eq!(relay.connect_attempts(), 1);

    patient.session.join(ROOM, PATIENT, "Alex").await.unwrap();
    assert_eq!(patient.devices.claimed(), 2);
    assert_eq!(relay.members(&RoomId::from(ROOM)), 1);
}
