use peerlink_client::PeerId;

use crate::integration::{init_tracing, registered_mock_peer};
use crate::utils::{EVENT_TIMEOUT_MS, EngineCall, MemoryRelay, MockEngineFactory, wait_until};

#[tokio::test]
async fn test_connect_twice_returns_same_connection() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (alice, _events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    let first = alice.connect("bob").await.unwrap();
    let second = alice.connect("bob").await.unwrap();
    assert!(first.same_as(&second));

    wait_until(EVENT_TIMEOUT_MS, || {
        relay.descriptions("alice", "bob").len() == 1
    })
    .await
    .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert_eq!(relay.descriptions("alice", "bob"), vec!["offer"]);
    assert_eq!(factory.engine_count(), 1);
    assert_eq!(factory.engine(0).count(&EngineCall::CreateOffer), 1);
    assert_eq!(
        factory.engine(0).count(&EngineCall::CreateDataChannel("data".into())),
        1
    );
    assert_eq!(alice.connection_ids().await, vec![PeerId::from("bob")]);
}

#[tokio::test]
async fn test_get_connection() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (alice, _events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    assert!(alice.get_connection(&PeerId::from("bob")).await.is_none());

    let connection = alice.connect("bob").await.unwrap();
    let found = alice.get_connection(&PeerId::from("bob")).await.unwrap();
    assert!(found.same_as(&connection));
    assert_eq!(alice.local_id().await, Some(PeerId::from("alice")));
}
