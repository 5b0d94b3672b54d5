use teleconsult_core::ParticipantId;
use teleconsult_engine::NegotiationError;
use teleconsult_engine::peer::{LinkState, PeerEvent};
use teleconsult_engine::transport::{LinkKey, TransportEvent, TransportState};

use super::{create_controller, pump, remote_answer, remote_offer};
use crate::integration::init_tracing;
use crate::utils::MockTransportFactory;

#[tokio::test]
async fn test_answer_publishes_stream_once_connected() {
    init_tracing();

    let transports = MockTransportFactory::new();
    let (mut controller, mut rx) = create_controller(&transports);
    let patient = ParticipantId::from("patient-1");

    let offer = controller.create_offer(&patient).await.unwrap();
    assert_eq!(offer.sdp_type, teleconsult_core::SdpType::Offer);
    assert_eq!(controller.link_state(&patient), Some(LinkState::Negotiating));

    let events = pump(&mut controller, &mut rx).await;
    assert!(matches!(
        events.as_slice(),
        [PeerEvent::SendCandidate { to, .. }] if *to == patient
    ));

    controller
        .handle_answer(&patient, remote_answer())
        .await
        .unwrap();
    let events = pump(&mut controller, &mut rx).await;

    let streams: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            PeerEvent::RemoteStreamReady(stream) => Some(stream),
            _ => None,
        })
        .collect();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].participant_id, patient);
    assert_eq!(streams[0].tracks.len(), 2);
    assert_eq!(controller.link_state(&patient), Some(LinkState::Connected));
}

#[tokio::test]
async fn test_late_answer_without_link_is_ignored() {
    init_tracing();

    let transports = MockTransportFactory::new();
    let (mut controller, _rx) = create_controller(&transports);
    let stranger = ParticipantId::from("stranger");

    assert_eq!(controller.handle_answer(&stranger, remote_answer()).await, Ok(()));
    assert_eq!(controller.link_state(&stranger), None);
    assert_eq!(transports.created(), 0);
}

#[tokio::test]
async fn test_failed_transport_tears_down_link() {
    init_tracing();

    let transports = MockTransportFactory::new();
    let (mut controller, mut rx) = create_controller(&transports);
    let doctor = ParticipantId::from("doctor-1");

    controller.handle_offer(&doctor, remote_offer()).await.unwrap();
    pump(&mut controller, &mut rx).await;
    assert_eq!(controller.link_state(&doctor), Some(LinkState::Connected));

    let key = LinkKey {
        participant_id: doctor.clone(),
        generation: 1,
    };
    let event = controller
        .handle_transport_event(TransportEvent::StateChanged(key, TransportState::Failed))
        .await;
    assert!(matches!(
        event,
        Some(PeerEvent::LinkClosed { participant_id, state: LinkState::Failed }) if participant_id == doctor
    ));
    assert_eq!(controller.link_state(&doctor), None);
    assert_eq!(transports.closed(), 1);
}

#[tokio::test]
async fn test_events_from_replaced_link_are_ignored() {
    init_tracing();

    let transports = MockTransportFactory::new();
    let (mut controller, mut rx) = create_controller(&transports);
    let doctor = ParticipantId::from("doctor-1");

    controller.create_offer(&doctor).await.unwrap();
    controller.create_offer(&doctor).await.unwrap();
    pump(&mut controller, &mut rx).await;
    assert_eq!(transports.created(), 2);
    assert_eq!(transports.closed(), 1);

    let stale = LinkKey {
        participant_id: doctor.clone(),
        generation: 1,
    };
    let event = controller
        .handle_transport_event(TransportEvent::StateChanged(stale, TransportState::Failed))
        .await;
    assert!(event.is_none());
    assert_eq!(controller.link_state(&doctor), Some(LinkState::Negotiating));
}

#[tokio::test]
async fn test_rejected_offer_tears_down_link() {
    init_tracing();

    let transports = MockTransportFactory::new();
    transports.reject_remote_descriptions();
    let (mut controller, _rx) = create_controller(&transports);
    let doctor = ParticipantId::from("doctor-1");

    let err = controller
        .handle_offer(&doctor, remote_offer())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NegotiationError::RemoteDescriptionRejected { participant_id, .. } if participant_id == doctor
    ));
    assert_eq!(controller.link_state(&doctor), None);
    assert_eq!(transports.closed(), 1);
}

#[tokio::test]
async fn test_close_all() {
    init_tracing();

    let transports = MockTransportFactory::new();
    let (mut controller, _rx) = create_controller(&transports);

    for id in ["a", "b", "c"] {
        controller.create_offer(&ParticipantId::from(id)).await.unwrap();
    }
    assert_eq!(controller.link_states().len(), 3);

    controller.close_all().await;
    assert_eq!(controller.link_count(), 0);
    assert_eq!(transports.closed(), 3);
    assert!(!controller.close(&ParticipantId::from("a")).await);
}
