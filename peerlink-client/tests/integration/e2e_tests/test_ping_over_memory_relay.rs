use std::sync::Arc;

use peerlink_client::{
    ConnectionEvent, ConnectionState, Peer, PeerConfig, PeerEvent, RtcEngineFactory,
};

use crate::integration::{init_tracing, next_connection, test_config};
use crate::utils::{CONNECTION_TIMEOUT_MS, EVENT_TIMEOUT_MS, MemoryRelay, wait_for, wait_for_state};

fn rtc_peer(relay: &MemoryRelay, config: PeerConfig) -> Peer {
    Peer::with_parts(config, Arc::new(relay.clone()), Arc::new(RtcEngineFactory))
}

async fn wait_open(events: &mut tokio::sync::mpsc::UnboundedReceiver<PeerEvent>) {
    wait_for(events, EVENT_TIMEOUT_MS, |e| {
        matches!(e, PeerEvent::Open).then_some(())
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_over_memory_relay() {
    init_tracing();

    let relay = MemoryRelay::new();
    let alice = rtc_peer(&relay, test_config());
    let bob = rtc_peer(&relay, test_config());

    let mut alice_events = alice.subscribe();
    let mut bob_events = bob.subscribe();
    alice.register("alice").unwrap();
    bob.register("bob").unwrap();
    wait_open(&mut alice_events).await;
    wait_open(&mut bob_events).await;

    let to_bob = alice.connect("bob").await.unwrap();
    let from_alice = next_connection(&mut bob_events).await.unwrap();
    let mut bob_inbox = from_alice.subscribe();

    wait_for_state(&to_bob, ConnectionState::Open, CONNECTION_TIMEOUT_MS)
        .await
        .unwrap();
    wait_for_state(&from_alice, ConnectionState::Open, CONNECTION_TIMEOUT_MS)
        .await
        .unwrap();

    to_bob.send("ping").await;

    let received = wait_for(&mut bob_inbox, CONNECTION_TIMEOUT_MS, |e| match e {
        ConnectionEvent::Message(data) => Some(data.clone()),
        _ => None,
    })
    .await
    .unwrap();
    assert_eq!(&received[..], b"ping");

    alice.close_all().await.unwrap();
    bob.close_all().await.unwrap();
    assert!(to_bob.state().is_closed());
    assert!(from_alice.state().is_closed());
}
