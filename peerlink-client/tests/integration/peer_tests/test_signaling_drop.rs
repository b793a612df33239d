use peerlink_client::{ConnectionState, PeerEvent, PeerId};

use crate::integration::{init_tracing, registered_mock_peer};
use crate::utils::{EVENT_TIMEOUT_MS, MemoryRelay, MockEngineFactory, wait_for, wait_until};

#[tokio::test]
async fn test_relay_drop_reports_disconnects_and_recovers() {
    init_tracing();

    let relay = MemoryRelay::new();
    let factory = MockEngineFactory::new();
    let (alice, mut events) = registered_mock_peer(&relay, &factory, "alice").await.unwrap();

    let bob = alice.connect("bob").await.unwrap();
    wait_until(EVENT_TIMEOUT_MS, || factory.engine_count() == 1)
        .await
        .unwrap();

    relay.drop_sessions();

    wait_for(&mut events, EVENT_TIMEOUT_MS, |e| {
        matches!(e, PeerEvent::Close).then_some(())
    })
    .await
    .unwrap();
    let gone = wait_for(&mut events, EVENT_TIMEOUT_MS, |e| match e {
        PeerEvent::Disconnected(id) => Some(id.clone()),
        _ => None,
    })
    .await
    .unwrap();
    assert_eq!(gone, PeerId::from("bob"));

    // The media path may outlive the relay.
    assert_ne!(bob.state(), ConnectionState::Closed);
    assert_eq!(alice.connection_ids().await, vec![PeerId::from("bob")]);
    assert_eq!(alice.local_id().await, Some(PeerId::from("alice")));

    wait_for(&mut events, EVENT_TIMEOUT_MS, |e| {
        matches!(e, PeerEvent::Open).then_some(())
    })
    .await
    .unwrap();
    assert!(relay.is_registered("alice"));
    assert_eq!(relay.connect_count(), 2);

    let again = alice.connect("bob").await.unwrap();
    assert!(again.same_as(&bob));
}
