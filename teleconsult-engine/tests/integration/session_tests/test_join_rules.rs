use teleconsult_core::RoomId;
use teleconsult_engine::SessionError;

use crate::integration::{PATIENT, ROOM, create_test_peer, init_tracing};
use crate::utils::{MockRelay, MockTransportFactory};

#[tokio::test]
async fn test_join_same_room_twice_is_noop() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    let patient = create_test_peer(&relay, &transports);

    patient.session.join(ROOM, PATIENT, "Alex").await.unwrap();
    patient.session.join(ROOM, PATIENT, "Alex").await.unwrap();

    assert_eq!(relay.connect_attempts(), 1);
    assert_eq!(patient.devices.opened(), 2);
    assert_eq!(patient.session.participants().len(), 1);
}

#[tokio::test]
async fn test_join_other_room_requires_leave() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    let patient = create_test_peer(&relay, &transports);

    patient.session.join(ROOM, PATIENT, "Alex").await.unwrap();
    let err = patient
        .session
        .join("consult-other", PATIENT, "Alex")
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::AlreadyInRoom(RoomId::from(ROOM)));
    assert_eq!(
        patient.session.snapshot().await.unwrap().room_id,
        Some(RoomId::from(ROOM))
    );

    patient.session.leave().await.unwrap();
    patient
        .session
        .join("consult-other", PATIENT, "Alex")
        .await
        .unwrap();

    assert_eq!(relay.connect_attempts(), 2);
    assert_eq!(relay.members(&RoomId::from("consult-other")), 1);
    assert_eq!(patient.devices.claimed(), 2);
}
