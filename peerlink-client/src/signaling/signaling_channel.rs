use futures::{SinkExt, StreamExt};
use peerlink_core::{RelayMessage, TransportError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::observers::lock;
use crate::signaling::{RelayConnector, SignalingEvent};

struct SignalingInner {
    url: String,
    connector: Arc<dyn RelayConnector>,
    events: mpsc::UnboundedSender<SignalingEvent>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    /// Bumped by every connect and close; sessions from older generations go silent.
    generation: AtomicU64,
    session: Mutex<Option<JoinHandle<()>>>,
}

impl SignalingInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn emit(&self, generation: u64, event: SignalingEvent) {
        if self.is_current(generation) {
            let _ = self.events.send(event);
        }
    }

    fn install(&self, generation: u64, tx: mpsc::UnboundedSender<String>) -> bool {
        let mut outbound = lock(&self.outbound);
        if !self.is_current(generation) {
            return false;
        }
        *outbound = Some(tx);
        true
    }

    fn uninstall(&self, generation: u64) {
        let mut outbound = lock(&self.outbound);
        if self.is_current(generation) {
            *outbound = None;
        }
    }

    fn dispatch(&self, generation: u64, text: &str) {
        match serde_json::from_str::<RelayMessage>(text) {
            Ok(message) => {
                debug!("relay -> {}", message.type_tag());
                self.emit(generation, SignalingEvent::Message(message));
            }
            Err(e) => {
                warn!("Discarding malformed relay frame: {}", e);
                self.emit(
                    generation,
                    SignalingEvent::Error(TransportError::Malformed(e.to_string())),
                );
            }
        }
    }
}

/// Message transport to the signaling relay.
///
/// Cheap to clone; every clone drives the same session. Events are delivered
/// through the receiver handed out by [`SignalingChannel::new`], in the order the
/// session produced them.
#[derive(Clone)]
pub struct SignalingChannel {
    inner: Arc<SignalingInner>,
}

impl SignalingChannel {
    pub fn new(
        url: impl Into<String>,
        connector: Arc<dyn RelayConnector>,
    ) -> (Self, mpsc::UnboundedReceiver<SignalingEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let channel = Self {
            inner: Arc::new(SignalingInner {
                url: url.into(),
                connector,
                events,
                outbound: Mutex::new(None),
                generation: AtomicU64::new(0),
                session: Mutex::new(None),
            }),
        };
        (channel, events_rx)
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn is_open(&self) -> bool {
        lock(&self.inner.outbound).is_some()
    }

    /// Starts a new session, discarding whatever session existed before.
    ///
    /// Returns immediately; `Open` or `Error` + `Close` follow on the event stream.
    pub fn connect(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.inner.outbound).take();

        let handle = tokio::spawn(run_session(self.inner.clone(), generation));
        if let Some(previous) = lock(&self.inner.session).replace(handle) {
            previous.abort();
        }
    }

    /// Serializes and sends one relay message.
    ///
    /// When no session is open nothing is transmitted and `Error(NotOpen)` is
    /// emitted in addition to the returned error.
    pub fn send(&self, message: &RelayMessage) -> Result<(), TransportError> {
        let result = self.try_send(message);
        if let Err(e) = &result {
            warn!("Cannot send {} to relay: {}", message.type_tag(), e);
            let _ = self.inner.events.send(SignalingEvent::Error(e.clone()));
        }
        result
    }

    fn try_send(&self, message: &RelayMessage) -> Result<(), TransportError> {
        let tx = lock(&self.inner.outbound)
            .clone()
            .ok_or(TransportError::NotOpen)?;
        let text =
            serde_json::to_string(message).map_err(|e| TransportError::Malformed(e.to_string()))?;
        tx.send(text).map_err(|_| TransportError::NotOpen)
    }

    /// Closes the current session. No `Close` event is produced for a local close.
    pub fn close(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.outbound).take();
        if let Some(session) = lock(&self.inner.session).take() {
            session.abort();
            info!("Signaling channel to {} closed", self.inner.url);
        }
    }
}

async fn run_session(inner: Arc<SignalingInner>, generation: u64) {
    info!("Connecting to signaling relay at {}", inner.url);

    let (mut sink, mut stream) = match inner.connector.connect(&inner.url).await {
        Ok(session) => session,
        Err(e) => {
            error!("Signaling connect to {} failed: {}", inner.url, e);
            inner.emit(generation, SignalingEvent::Error(e));
            inner.emit(generation, SignalingEvent::Close);
            return;
        }
    };

    let (tx, mut outgoing) = mpsc::unbounded_channel::<String>();
    if !inner.install(generation, tx) {
        return;
    }
    inner.emit(generation, SignalingEvent::Open);

    loop {
        tokio::select! {
            frame = outgoing.recv() => {
                let Some(text) = frame else { break };
                if let Err(e) = sink.send(text).await {
                    error!("Relay write failed: {}", e);
                    inner.emit(generation, SignalingEvent::Error(e));
                    break;
                }
            }

            frame = stream.next() => match frame {
                Some(Ok(text)) => inner.dispatch(generation, &text),
                Some(Err(e @ TransportError::Malformed(_))) => {
                    warn!("Discarding unreadable relay frame: {}", e);
                    inner.emit(generation, SignalingEvent::Error(e));
                }
                Some(Err(e)) => {
                    warn!("Relay read failed: {}", e);
                    inner.emit(generation, SignalingEvent::Error(e));
                    break;
                }
                None => {
                    info!("Relay closed the session");
                    break;
                }
            },
        }
    }

    inner.uninstall(generation);
    inner.emit(generation, SignalingEvent::Close);
    let _ = sink.close().await;
}
