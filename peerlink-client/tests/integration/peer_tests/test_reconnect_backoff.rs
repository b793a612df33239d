use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use peerlink_client::{Peer, PeerError, PeerEvent};

use crate::integration::{init_tracing, test_config};
use crate::utils::{EVENT_TIMEOUT_MS, MemoryRelay, MockEngineFactory, drain_for, wait_for};

const RETRY_DELAY: Duration = Duration::from_millis(100);
const SLACK: Duration = Duration::from_millis(10);

async fn registered_peer(relay: &MemoryRelay) -> (Peer, tokio::sync::mpsc::UnboundedReceiver<PeerEvent>) {
    let config = test_config()
        .with_max_retries(3)
        .with_retry_delay(RETRY_DELAY);
    let peer = Peer::with_parts(
        config,
        Arc::new(relay.clone()),
        Arc::new(MockEngineFactory::new()),
    );
    let mut events = peer.subscribe();
    peer.register("alice").unwrap();
    wait_for(&mut events, EVENT_TIMEOUT_MS, |e| {
        matches!(e, PeerEvent::Open).then_some(())
    })
    .await
    .unwrap();
    (peer, events)
}

fn assert_gap(from: Instant, to: Instant, expected: Duration) {
    let gap = to - from;
    assert!(
        gap >= expected && gap < expected + SLACK,
        "expected a gap of {expected:?}, got {gap:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_linearly_then_gives_up() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (_alice, mut events) = registered_peer(&relay).await;

    relay.refuse_connects(true);
    let dropped_at = Instant::now();
    relay.drop_sessions();

    let attempts = wait_for(&mut events, EVENT_TIMEOUT_MS, |e| match e {
        PeerEvent::Error(PeerError::ReconnectExhausted { attempts }) => Some(*attempts),
        _ => None,
    })
    .await
    .unwrap();
    assert_eq!(attempts, 3);

    let times = relay.connect_times();
    assert_eq!(times.len(), 4, "one registration plus three retries");
    assert_gap(dropped_at, times[1], RETRY_DELAY);
    assert_gap(times[1], times[2], RETRY_DELAY * 2);
    assert_gap(times[2], times[3], RETRY_DELAY * 3);

    let later = drain_for(&mut events, 10_000).await;
    assert!(
        !later
            .iter()
            .any(|e| matches!(e, PeerEvent::Error(PeerError::ReconnectExhausted { .. }))),
        "exhaustion is reported once"
    );
    assert_eq!(relay.connect_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_successful_reconnect_resets_backoff() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (_alice, mut events) = registered_peer(&relay).await;

    for round in 1..=4 {
        let dropped_at = Instant::now();
        relay.drop_sessions();

        wait_for(&mut events, EVENT_TIMEOUT_MS, |e| {
            matches!(e, PeerEvent::Open).then_some(())
        })
        .await
        .unwrap();

        let times = relay.connect_times();
        assert_eq!(times.len(), round + 1);
        assert_gap(dropped_at, times[round], RETRY_DELAY);
    }
}
