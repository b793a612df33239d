use peerlink_client::{
    ConnectionState, NegotiationPayload, PeerId, RelayMessage, SdpRole, SessionDescription,
};

use crate::integration::{init_tracing, next_connection, registered_mock_peer};
use crate::utils::{
    EVENT_TIMEOUT_MS, EngineCall, MemoryRelay, MockEngineFactory, drain_for, wait_for_state,
    wait_until,
};

fn description_from(from: &str, desc: SessionDescription) -> RelayMessage {
    RelayMessage::signal_from(PeerId::from(from), NegotiationPayload::Description(desc))
}

#[tokio::test]
async fn test_reoffer_on_open_connection_is_answered() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (alice, mut events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    assert!(relay.inject("alice", &description_from("bob", SessionDescription::offer("offer-1"))));
    let connection = next_connection(&mut events).await.unwrap();
    wait_until(EVENT_TIMEOUT_MS, || relay.descriptions("alice", "bob") == vec!["answer"])
        .await
        .unwrap();

    let engine = factory.engine(0);
    engine.open_channel();
    wait_for_state(&connection, ConnectionState::Open, EVENT_TIMEOUT_MS)
        .await
        .unwrap();
    let mut changes = connection.state_changes();
    changes.mark_unchanged();

    assert!(relay.inject("alice", &description_from("bob", SessionDescription::offer("offer-2"))));
    wait_until(EVENT_TIMEOUT_MS, || {
        relay.descriptions("alice", "bob") == vec!["answer", "answer"]
    })
    .await
    .unwrap();

    assert_eq!(engine.count(&EngineCall::SetRemote(SdpRole::Offer)), 2);
    assert_eq!(engine.count(&EngineCall::CreateAnswer), 2);
    assert_eq!(engine.count(&EngineCall::SetLocal(SdpRole::Answer)), 2);

    assert_eq!(connection.state(), ConnectionState::Open);
    assert!(!changes.has_changed().unwrap(), "open connection was demoted");
    assert_eq!(factory.engine_count(), 1);
    assert_eq!(alice.connection_ids().await, vec![PeerId::from("bob")]);
}

#[tokio::test]
async fn test_reanswer_on_open_connection_is_applied_quietly() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (alice, _events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    let connection = alice.connect("bob").await.unwrap();
    wait_until(EVENT_TIMEOUT_MS, || relay.descriptions("alice", "bob").len() == 1)
        .await
        .unwrap();
    let engine = factory.engine(0);
    assert!(relay.inject("alice", &description_from("bob", SessionDescription::answer("answer-1"))));
    engine.open_channel();
    wait_for_state(&connection, ConnectionState::Open, EVENT_TIMEOUT_MS)
        .await
        .unwrap();

    assert!(relay.inject("alice", &description_from("bob", SessionDescription::answer("answer-2"))));
    wait_until(EVENT_TIMEOUT_MS, || {
        engine.count(&EngineCall::SetRemote(SdpRole::Answer)) == 2
    })
    .await
    .unwrap();

    let mut conn_events = connection.subscribe();
    assert!(drain_for(&mut conn_events, 100).await.is_empty());
    assert_eq!(engine.count(&EngineCall::CreateAnswer), 0);
    assert_eq!(relay.descriptions("alice", "bob"), vec!["offer"]);
    assert_eq!(connection.state(), ConnectionState::Open);
}
