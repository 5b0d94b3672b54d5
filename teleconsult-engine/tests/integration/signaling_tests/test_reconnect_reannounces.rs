use std::time::Duration;

use teleconsult_core::{ParticipantRole, RoomId};
use teleconsult_engine::signaling::{ConnectionState, SignalingEvent};

use super::{connected_client, participant};
use crate::integration::{ROOM, init_tracing};
use crate::utils::{EVENT_TIMEOUT_MS, MockRelay, wait_for_signal};

#[tokio::test(start_paused = true)]
async fn test_reconnect_reannounces() {
    init_tracing();

    let relay = MockRelay::new();
    let room = RoomId::from(ROOM);
    let (client, mut events) =
        connected_client(&relay, &room, participant("patient-1", ParticipantRole::Patient)).await;

    relay.refuse_connections(1);
    relay.drop_room(&room);

    let first = wait_for_signal(&mut events, EVENT_TIMEOUT_MS, |_| true).await;
    assert!(matches!(
        first,
        Some(SignalingEvent::Reconnecting { attempt: 1, delay }) if delay == Duration::from_secs(2)
    ));
    let second = wait_for_signal(&mut events, EVENT_TIMEOUT_MS, |_| true).await;
    assert!(matches!(
        second,
        Some(SignalingEvent::Reconnecting { attempt: 2, delay }) if delay == Duration::from_secs(4)
    ));
    let third = wait_for_signal(&mut events, EVENT_TIMEOUT_MS, |_| true).await;
    assert!(matches!(third, Some(SignalingEvent::Connected)));
    assert_eq!(client.state(), ConnectionState::Connected);

    // Let the relay pump the re-announcement.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let announcements = relay.messages_of("user-joined");
    assert_eq!(announcements.len(), 2);
    assert!(announcements.iter().all(|m| m.to.is_none()));
    assert_eq!(relay.connect_attempts(), 3);
    assert_eq!(relay.members(&room), 1);
}
