use peerlink_client::{
    IceCandidate, NegotiationPayload, PeerError, PeerEvent, PeerId, RelayMessage,
    SessionDescription, TransportError,
};

use crate::integration::{init_tracing, registered_mock_peer};
use crate::utils::{EVENT_TIMEOUT_MS, MemoryRelay, MockEngineFactory, drain_for, wait_for, wait_until};

fn signal(from: &str, payload: NegotiationPayload) -> RelayMessage {
    RelayMessage::signal_from(PeerId::from(from), payload)
}

#[tokio::test]
async fn test_burst_for_unknown_peer_creates_one_connection() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (alice, mut events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    relay.inject(
        "alice",
        &signal(
            "bob",
            NegotiationPayload::Description(SessionDescription::offer("remote-offer")),
        ),
    );
    for i in 0..10 {
        relay.inject(
            "alice",
            &signal(
                "bob",
                NegotiationPayload::candidate(IceCandidate::new(format!("candidate:{i}"))),
            ),
        );
    }

    wait_until(EVENT_TIMEOUT_MS, || {
        factory.engine_count() == 1 && factory.engine(0).applied_candidates().len() == 10
    })
    .await
    .unwrap();

    let announced = drain_for(&mut events, 200)
        .await
        .into_iter()
        .filter(|e| matches!(e, PeerEvent::Connection(_)))
        .count();
    assert_eq!(announced, 1);
    assert_eq!(factory.engine_count(), 1);
    assert_eq!(alice.connection_ids().await, vec![PeerId::from("bob")]);
}

#[tokio::test]
async fn test_each_remote_gets_its_own_connection() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (alice, mut events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    for from in ["bob", "carol"] {
        relay.inject(
            "alice",
            &signal(
                from,
                NegotiationPayload::Description(SessionDescription::offer("remote-offer")),
            ),
        );
    }

    let mut announced = Vec::new();
    for _ in 0..2 {
        let id = wait_for(&mut events, EVENT_TIMEOUT_MS, |e| match e {
            PeerEvent::Connection(connection) => Some(connection.peer_id().clone()),
            _ => None,
        })
        .await
        .unwrap();
        announced.push(id);
    }
    announced.sort();

    assert_eq!(announced, vec![PeerId::from("bob"), PeerId::from("carol")]);
    assert_eq!(alice.connection_ids().await, announced);
}

#[tokio::test]
async fn test_relay_error_is_surfaced() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (alice, mut events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    alice.connect("nobody").await.unwrap();

    let error = wait_for(&mut events, EVENT_TIMEOUT_MS, |e| match e {
        PeerEvent::Error(PeerError::Transport(TransportError::Relay(message))) => {
            Some(message.clone())
        }
        _ => None,
    })
    .await
    .unwrap();
    assert!(error.contains("nobody"), "unexpected relay error: {error}");
}
