use bytes::Bytes;
use peerlink_core::{NegotiationPayload, PeerError, PeerId, RemoteTrackGroup, RtcConfig};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::call::LocalTrack;
use crate::connection::connection_task::{self, ConnectionInput};
use crate::connection::{ConnectionEvent, ConnectionRole, ConnectionState};
use crate::observers::{Observers, lock};
use crate::signaling::SignalingChannel;
use crate::transport::{DataChannel, EngineFactory, NegotiationEngine};

pub(crate) struct ConnectionShared {
    pub(crate) peer_id: PeerId,
    pub(crate) role: ConnectionRole,
    state: watch::Sender<ConnectionState>,
    pub(crate) events: Observers<ConnectionEvent>,
    pub(crate) tracks: Observers<RemoteTrackGroup>,
    closure: Observers<PeerId>,
    channel: Mutex<Option<Arc<dyn DataChannel>>>,
    engine: Mutex<Option<Arc<dyn NegotiationEngine>>>,
}

impl ConnectionShared {
    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    /// Moves to `next` if legal. Returns whether the state changed.
    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if current.can_become(next) {
                *current = next;
                true
            } else {
                false
            }
        });
        if changed {
            info!("Connection to {} is now {}", self.peer_id, next);
        }
        changed
    }

    /// Negotiation never demotes an open connection.
    pub(crate) fn begin_negotiating(&self, role: ConnectionRole) {
        if matches!(
            self.state(),
            ConnectionState::Created | ConnectionState::Negotiating(_)
        ) {
            self.transition(ConnectionState::Negotiating(role));
        }
    }

    /// Enters `Closed` and notifies everyone. Returns false when already closed.
    pub(crate) fn finish(&self) -> bool {
        if !self.transition(ConnectionState::Closed) {
            return false;
        }
        self.events.emit(ConnectionEvent::Close);
        self.closure.emit(self.peer_id.clone());
        true
    }

    pub(crate) fn channel(&self) -> Option<Arc<dyn DataChannel>> {
        lock(&self.channel).clone()
    }

    pub(crate) fn set_channel(&self, channel: Arc<dyn DataChannel>) {
        if let Some(previous) = lock(&self.channel).replace(channel) {
            debug!(
                "Data channel '{}' to {} replaced",
                previous.label(),
                self.peer_id
            );
        }
    }

    /// Publishes the engine so `close` can reach it. False if the connection closed meanwhile.
    pub(crate) fn install_engine(&self, engine: Arc<dyn NegotiationEngine>) -> bool {
        let mut slot = lock(&self.engine);
        if self.is_closed() {
            return false;
        }
        *slot = Some(engine);
        true
    }

    /// Closes the data channel and the engine, whoever gets here first.
    pub(crate) async fn release(&self) {
        let channel = lock(&self.channel).take();
        if let Some(channel) = channel {
            if let Err(e) = channel.close().await {
                debug!("Closing data channel to {}: {:#}", self.peer_id, e);
            }
        }

        let engine = lock(&self.engine).take();
        if let Some(engine) = engine {
            if let Err(e) = engine.close().await {
                debug!("Closing engine for {}: {:#}", self.peer_id, e);
            }
        }
    }
}

/// A direct session with one remote peer.
///
/// Cheap to clone. All negotiation for the peer happens on a single task that
/// applies inbound payloads strictly in the order they were delivered.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<ConnectionShared>,
    inbox: mpsc::UnboundedSender<ConnectionInput>,
}

impl Connection {
    /// Creates the connection and its task. The returned handle accepts input immediately.
    pub(crate) fn spawn(
        peer_id: PeerId,
        role: ConnectionRole,
        factory: Arc<dyn EngineFactory>,
        rtc_config: RtcConfig,
        signaling: SignalingChannel,
        initial: Vec<ConnectionInput>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Created);
        let shared = Arc::new(ConnectionShared {
            peer_id,
            role,
            state,
            events: Observers::new(),
            tracks: Observers::new(),
            closure: Observers::new(),
            channel: Mutex::new(None),
            engine: Mutex::new(None),
        });

        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        for input in initial {
            let _ = inbox.send(input);
        }

        tokio::spawn(connection_task::run(
            shared.clone(),
            factory,
            rtc_config,
            signaling,
            inbox_rx,
        ));

        Self { shared, inbox }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.shared.peer_id
    }

    pub fn role(&self) -> ConnectionRole {
        self.shared.role
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    /// Track groups announced by the remote side, as the engine reports them.
    pub fn remote_tracks(&self) -> mpsc::UnboundedReceiver<RemoteTrackGroup> {
        self.shared.tracks.subscribe()
    }

    /// Registers for closure notifications; each carries this connection's peer id.
    ///
    /// An already closed connection notifies right away.
    pub fn on_close(&self, tx: mpsc::UnboundedSender<PeerId>) {
        let shared = &self.shared;
        if let Err(tx) = shared.closure.attach_unless(tx, || shared.is_closed()) {
            let _ = tx.send(shared.peer_id.clone());
        }
    }

    /// Sends over the data channel. Silently dropped unless the connection is open.
    pub async fn send(&self, data: impl Into<Bytes>) {
        if !self.state().is_open() {
            debug!("Dropping send to {}: connection is {}", self.peer_id(), self.state());
            return;
        }
        let Some(channel) = self.shared.channel() else {
            return;
        };
        if let Err(e) = channel.send(data.into()).await {
            self.shared
                .events
                .emit(ConnectionEvent::Error(PeerError::negotiation("send", e)));
        }
    }

    /// Closes the data channel and the engine. Idempotent; `Close` fires once.
    pub async fn close(&self) {
        if !self.shared.finish() {
            return;
        }
        let _ = self.inbox.send(ConnectionInput::Shutdown);
        self.shared.release().await;
    }

    /// Whether both handles drive the same connection.
    pub fn same_as(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn deliver(&self, payload: NegotiationPayload) {
        if self.inbox.send(ConnectionInput::Remote(payload)).is_err() {
            debug!("Connection task for {} is gone, payload dropped", self.peer_id());
        }
    }

    /// Attaches tracks and offers again so the remote side learns about them.
    pub(crate) fn attach_tracks(&self, tracks: Vec<Arc<dyn LocalTrack>>) {
        let _ = self.inbox.send(ConnectionInput::AddTracks(tracks));
        let _ = self.inbox.send(ConnectionInput::Offer);
    }

    /// Reports this connection as disconnected without closing it.
    pub(crate) fn notify_disconnected(&self) {
        self.shared.closure.emit(self.shared.peer_id.clone());
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer_id", self.peer_id())
            .field("role", &self.role())
            .field("state", &self.state())
            .finish()
    }
}
