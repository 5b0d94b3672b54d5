use teleconsult_core::{ConnectionQuality, ParticipantId};

use super::create_controller;
use crate::integration::init_tracing;
use crate::utils::MockTransportFactory;

#[tokio::test]
async fn test_quality_classification() {
    init_tracing();

    let transports = MockTransportFactory::new();
    let (mut controller, _rx) = create_controller(&transports);
    let doctor = ParticipantId::from("doctor-1");

    let sample = controller.get_quality(&doctor).await;
    assert_eq!(sample.level, ConnectionQuality::Disconnected);

    controller.create_offer(&doctor).await.unwrap();

    transports.set_stats(Some(120.0), 5);
    let sample = controller.get_quality(&doctor).await;
    assert_eq!(sample.level, ConnectionQuality::Excellent);
    assert_eq!(sample.latency_ms, 120.0);
    assert_eq!(sample.packet_loss, 5);

    transports.set_stats(Some(250.0), 30);
    assert_eq!(controller.get_quality(&doctor).await.level, ConnectionQuality::Good);

    transports.set_stats(Some(120.0), 51);
    assert_eq!(controller.get_quality(&doctor).await.level, ConnectionQuality::Poor);

    // No RTT sample yet: classified on loss alone.
    transports.set_stats(None, 0);
    let sample = controller.get_quality(&doctor).await;
    assert_eq!(sample.level, ConnectionQuality::Excellent);
    assert_eq!(sample.latency_ms, 0.0);

    controller.close(&doctor).await;
    assert_eq!(
        controller.get_quality(&doctor).await.level,
        ConnectionQuality::Disconnected
    );
}
