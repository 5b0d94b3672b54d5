use std::time::Duration;

use teleconsult_core::{ParticipantId, ParticipantRole, RoomId, SignalKind};
use teleconsult_engine::SignalingError;
use teleconsult_engine::signaling::{ConnectionState, SignalingEvent};

use super::{connected_client, participant};
use crate::integration::{ROOM, init_tracing};
use crate::utils::{EVENT_TIMEOUT_MS, MockRelay, wait_for_signal};

#[tokio::test(start_paused = true)]
async fn test_leave_room_suppresses_reconnect() {
    init_tracing();

    let relay = MockRelay::new();
    let room = RoomId::from(ROOM);
    let (mut patient, mut patient_events) =
        connected_client(&relay, &room, participant("patient-1", ParticipantRole::Patient)).await;
    let (_doctor, mut doctor_events) =
        connected_client(&relay, &room, participant("doctor-1", ParticipantRole::Doctor)).await;

    patient.leave_room().await;
    assert_eq!(patient.state(), ConnectionState::Closed);

    let left = wait_for_signal(&mut doctor_events, EVENT_TIMEOUT_MS, |e| {
        matches!(e, SignalingEvent::ParticipantLeft(_))
    })
    .await;
    assert!(matches!(
        left,
        Some(SignalingEvent::ParticipantLeft(id)) if id == ParticipantId::from("patient-1")
    ));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(relay.connect_attempts(), 2);
    assert_eq!(relay.members(&room), 1);
    while let Ok(event) = patient_events.try_recv() {
        assert!(
            !matches!(event, SignalingEvent::Reconnecting { .. }),
            "Reconnected after leave_room"
        );
    }

    assert_eq!(
        patient.send(SignalKind::UserLeft, None),
        Err(SignalingError::NotConnected)
    );
}
