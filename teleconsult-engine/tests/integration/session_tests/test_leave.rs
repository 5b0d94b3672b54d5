use teleconsult_core::{ParticipantId, RoomId, SessionDescription, SignalKind, SignalMessage};
use teleconsult_engine::{SessionError, SessionEvent};

use super::is_left;
use crate::integration::{DOCTOR, PATIENT, ROOM, connect_pair, create_test_peer, init_tracing};
use crate::utils::{
    EVENT_TIMEOUT_MS, MockRelay, MockTransportFactory, wait_for_event, wait_until,
};

#[tokio::test]
async fn test_leave_twice_is_idempotent() {
    init_tracing();

    let mut pair = connect_pair(Default::default()).await;

    pair.patient.session.leave().await.unwrap();
    let first = pair.patient.session.snapshot().await.unwrap();
    pair.patient.session.leave().await.unwrap();
    let second = pair.patient.session.snapshot().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, Default::default());
    assert_eq!(pair.patient.devices.claimed(), 0);

    wait_for_event(&mut pair.doctor_events, EVENT_TIMEOUT_MS, |e| is_left(e, PATIENT))
        .await
        .expect("Doctor never saw the patient leave");
    assert_eq!(pair.relay.messages_of("user-left").len(), 1);
}

#[tokio::test]
async fn test_leave_before_join_is_ok() {
    init_tracing();

    let relay = crate::utils::MockRelay::new();
    let transports = crate::utils::MockTransportFactory::new();
    let patient = crate::integration::create_test_peer(&relay, &transports);

    patient.session.leave().await.unwrap();
    assert!(relay.messages().is_empty());
    assert_eq!(patient.devices.claimed(), 0);
}

#[tokio::test]
async fn test_end_call_ends_for_everyone() {
    init_tracing();

    let mut pair = connect_pair(Default::default()).await;
    pair.doctor.session.end_call().await.unwrap();

    let ended = wait_for_event(&mut pair.patient_events, EVENT_TIMEOUT_MS, |e| {
        matches!(e, SessionEvent::CallEnded { .. })
    })
    .await
    .expect("Patient never saw the call end");
    assert!(matches!(ended, SessionEvent::CallEnded { by } if by.as_str() == DOCTOR));

    let snapshot = pair.patient.session.snapshot().await.unwrap();
    assert_eq!(snapshot.room_id, None);
    assert_eq!(pair.patient.devices.claimed(), 0);
    assert_eq!(pair.doctor.devices.claimed(), 0);
    assert_eq!(pair.relay.messages_of("call-ended").len(), 1);
}

#[tokio::test]
async fn test_leave_aborts_join_waiting_for_camera() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    let patient = create_test_peer(&relay, &transports);
    patient.devices.stall_camera();

    let session = patient.session.clone();
    let join = tokio::spawn(async move { session.join(ROOM, PATIENT, "Alex").await });

    // Microphone is claimed first, then the camera prompt hangs.
    assert!(wait_until(EVENT_TIMEOUT_MS, || patient.devices.claimed() == 1).await);

    patient.session.leave().await.unwrap();
    let result = tokio::time::timeout(std::time::Duration::from_millis(EVENT_TIMEOUT_MS), join)
        .await
        .expect("Join did not return after leave")
        .unwrap();

    assert_eq!(result, Err(SessionError::Cancelled));
    assert_eq!(patient.devices.claimed(), 0);
    assert_eq!(relay.connect_attempts(), 0);
    assert_eq!(patient.session.snapshot().await.unwrap(), Default::default());
}

#[tokio::test]
async fn test_leave_closes_link_stuck_in_negotiation() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    transports.stall_remote_descriptions();
    let patient = create_test_peer(&relay, &transports);

    patient.session.join(ROOM, PATIENT, "Alex").await.unwrap();

    let offer = SignalMessage::new(
        RoomId::from(ROOM),
        ParticipantId::from(DOCTOR),
        SignalKind::Offer(SessionDescription::offer("v=0\r\nm=audio\r\nm=video\r\n")),
    )
    .to(ParticipantId::from(PATIENT));
    relay.inject(&RoomId::from(ROOM), &offer.to_json().unwrap());

    // The patient is now suspended applying the remote description.
    assert!(wait_until(EVENT_TIMEOUT_MS, || transports.created() == 1).await);

    patient.session.leave().await.unwrap();

    assert_eq!(transports.closed(), 1);
    assert_eq!(patient.devices.claimed(), 0);
    let snapshot = patient.session.snapshot().await.unwrap();
    assert!(snapshot.links.is_empty());
    assert_eq!(snapshot.room_id, None);
}
