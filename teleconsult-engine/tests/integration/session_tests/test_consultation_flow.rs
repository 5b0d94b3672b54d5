use teleconsult_core::ParticipantRole;
use teleconsult_engine::SessionEvent;

use super::{is_joined, is_left, is_stream_removed, roster_ids};
use crate::integration::{
    DOCTOR, PATIENT, ROOM, connect_pair, create_test_peer, create_test_peer_with, doctor_config,
    init_tracing, is_stream_from,
};
use crate::utils::{EVENT_TIMEOUT_MS, MockRelay, MockTransportFactory, wait_for_event};

#[tokio::test]
async fn test_patient_sees_doctor_join_and_stream() {
    init_tracing();

    let relay = MockRelay::new();
    let transports = MockTransportFactory::new();
    let patient = create_test_peer(&relay, &transports);
    let doctor = create_test_peer_with(&relay, &transports, doctor_config());
    let mut patient_events = patient.session.subscribe();
    let mut doctor_events = doctor.session.subscribe();

    patient.session.join(ROOM, PATIENT, "Alex").await.unwrap();
    doctor.session.join(ROOM, DOCTOR, "Dr. Grey").await.unwrap();

    let joined = wait_for_event(&mut patient_events, EVENT_TIMEOUT_MS, |e| is_joined(e, DOCTOR))
        .await
        .expect("Patient never saw the doctor join");
    let SessionEvent::ParticipantJoined(participant) = joined else {
        unreachable!()
    };
    assert_eq!(participant.role, ParticipantRole::Doctor);
    assert_eq!(participant.display_name, "Dr. Grey");

    let stream = wait_for_event(&mut patient_events, EVENT_TIMEOUT_MS, |e| is_stream_from(e, DOCTOR))
        .await
        .expect("Patient never received the doctor's stream");
    let SessionEvent::RemoteStream { stream, .. } = stream else {
        unreachable!()
    };
    assert_eq!(stream.tracks.len(), 2);

    let joined = wait_for_event(&mut doctor_events, EVENT_TIMEOUT_MS, |e| is_joined(e, PATIENT))
        .await
        .expect("Doctor never saw the patient");
    assert!(matches!(
        joined,
        SessionEvent::ParticipantJoined(p) if p.role == ParticipantRole::Patient
    ));

    // Only the member already in the room offers.
    let offers = relay.messages_of("offer");
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].from.as_str(), PATIENT);
    assert_eq!(offers[0].to.as_ref().map(|id| id.as_str()), Some(DOCTOR));

    assert_eq!(roster_ids(&patient.session), vec![DOCTOR, PATIENT]);
    assert_eq!(patient.session.remote_streams().len(), 1);
}

#[tokio::test]
async fn test_doctor_leaving_withdraws_stream_then_participant() {
    init_tracing();

    let mut pair = connect_pair(Default::default()).await;
    pair.doctor.session.leave().await.unwrap();

    let first = wait_for_event(&mut pair.patient_events, EVENT_TIMEOUT_MS, |e| {
        is_stream_removed(e, DOCTOR) || is_left(e, DOCTOR)
    })
    .await
    .expect("Patient never noticed the doctor leaving");
    assert!(is_stream_removed(&first, DOCTOR));

    let second = wait_for_event(&mut pair.patient_events, EVENT_TIMEOUT_MS, |e| is_left(e, DOCTOR))
        .await;
    assert!(second.is_some());

    assert_eq!(roster_ids(&pair.patient.session), vec![PATIENT]);
    assert!(pair.patient.session.remote_streams().is_empty());

    let snapshot = pair.patient.session.snapshot().await.unwrap();
    assert!(snapshot.links.is_empty());
    assert_eq!(snapshot.held_devices, 2);

    // The doctor's side is fully torn down.
    let snapshot = pair.doctor.session.snapshot().await.unwrap();
    assert_eq!(snapshot, Default::default());
    assert_eq!(pair.doctor.devices.claimed(), 0);
    assert_eq!(pair.relay.messages_of("user-left").len(), 1);
}
