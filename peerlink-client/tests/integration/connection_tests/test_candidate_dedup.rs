use peerlink_client::{IceCandidate, NegotiationPayload, PeerId, RelayMessage, SessionDescription};

use crate::integration::{init_tracing, next_connection, registered_mock_peer};
use crate::utils::{EVENT_TIMEOUT_MS, MemoryRelay, MockEngineFactory, wait_until};

fn candidate_from(from: &str, candidate: &str) -> RelayMessage {
    RelayMessage::signal_from(
        PeerId::from(from),
        NegotiationPayload::candidate(IceCandidate::new(candidate)),
    )
}

#[tokio::test]
async fn test_duplicate_candidates_apply_once() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (_alice, mut events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    let offer = RelayMessage::signal_from(
        PeerId::from("bob"),
        NegotiationPayload::Description(SessionDescription::offer("remote-offer")),
    );
    assert!(relay.inject("alice", &offer));
    next_connection(&mut events).await.unwrap();

    for _ in 0..3 {
        assert!(relay.inject("alice", &candidate_from("bob", "candidate:1")));
    }
    assert!(relay.inject("alice", &candidate_from("bob", "candidate:2")));
    assert!(relay.inject("alice", &candidate_from("bob", "candidate:1")));

    wait_until(EVENT_TIMEOUT_MS, || {
        factory.engine_count() == 1 && factory.engine(0).applied_candidates().len() >= 2
    })
    .await
    .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert_eq!(
        factory.engine(0).applied_candidates(),
        vec!["candidate:1".to_string(), "candidate:2".to_string()]
    );
}

#[tokio::test]
async fn test_candidate_fields_are_part_of_identity() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (_alice, mut events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    let offer = RelayMessage::signal_from(
        PeerId::from("bob"),
        NegotiationPayload::Description(SessionDescription::offer("remote-offer")),
    );
    relay.inject("alice", &offer);
    next_connection(&mut events).await.unwrap();

    let mut other_mid = IceCandidate::new("candidate:1");
    other_mid.sdp_mid = Some("1".into());

    relay.inject("alice", &candidate_from("bob", "candidate:1"));
    relay.inject(
        "alice",
        &RelayMessage::signal_from(PeerId::from("bob"), NegotiationPayload::candidate(other_mid)),
    );

    wait_until(EVENT_TIMEOUT_MS, || {
        factory.engine_count() == 1 && factory.engine(0).applied_candidates().len() == 2
    })
    .await
    .unwrap();
}
