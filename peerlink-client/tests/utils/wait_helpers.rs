use anyhow::{Context, Result, bail};
use std::time::Duration;
use tokio::sync::mpsc;

use peerlink_client::{Connection, ConnectionState};

/// Timeout for signaling round-trips through the in-memory relay (ms).
pub const EVENT_TIMEOUT_MS: u64 = 5000;

/// Timeout for a real webrtc-rs session to come up on loopback (ms).
pub const CONNECTION_TIMEOUT_MS: u64 = 15000;

/// Waits for the next event that `pick` accepts, skipping everything else.
pub async fn wait_for<E, T>(
    rx: &mut mpsc::UnboundedReceiver<E>,
    timeout_ms: u64,
    mut pick: impl FnMut(&E) -> Option<T>,
) -> Result<T> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .context("Timeout waiting for event")?
            .context("Event channel closed")?;

        if let Some(value) = pick(&event) {
            return Ok(value);
        }
    }
}

/// Collects every event that arrives within `window_ms`.
pub async fn drain_for<E>(rx: &mut mpsc::UnboundedReceiver<E>, window_ms: u64) -> Vec<E> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(window_ms);
    let mut events = Vec::new();

    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        events.push(event);
    }
    events
}

/// Polls `condition` every 10ms until it holds.
pub async fn wait_until(timeout_ms: u64, mut condition: impl FnMut() -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            bail!("Timeout waiting for condition");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

pub async fn wait_for_state(
    connection: &Connection,
    state: ConnectionState,
    timeout_ms: u64,
) -> Result<()> {
    let mut changes = connection.state_changes();
    tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        changes.wait_for(|current| *current == state),
    )
    .await
    .with_context(|| format!("Timeout waiting for state {state} (now {})", connection.state()))?
    .context("Connection state channel closed")?;
    Ok(())
}
