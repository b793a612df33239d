use peerlink_core::{MediaOptions, PeerError, PeerId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::call::{CallEvent, LocalTrack, MediaProvider, RemoteStream};
use crate::connection::Connection;
use crate::observers::{Observers, lock};
use crate::peer::Peer;

#[derive(Default)]
struct CallSlots {
    local_tracks: Vec<Arc<dyn LocalTrack>>,
    connection: Option<Connection>,
    aggregator: Option<JoinHandle<()>>,
}

struct CallShared {
    remote: PeerId,
    peer: Peer,
    provider: Arc<dyn MediaProvider>,
    events: Observers<CallEvent>,
    slots: Mutex<CallSlots>,
    /// Held for the whole of `start`, so concurrent starts run one after another.
    starting: AsyncMutex<()>,
    closed: AtomicBool,
}

impl CallShared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn emit(&self, event: CallEvent) {
        if !self.is_closed() {
            self.events.emit(event);
        }
    }
}

/// A media session with one remote peer, riding on that peer's connection.
#[derive(Clone)]
pub struct Call {
    shared: Arc<CallShared>,
}

impl Call {
    pub fn new(peer: Peer, remote: PeerId, provider: Arc<dyn MediaProvider>) -> Self {
        Self {
            shared: Arc::new(CallShared {
                remote,
                peer,
                provider,
                events: Observers::new(),
                slots: Mutex::new(CallSlots::default()),
                starting: AsyncMutex::new(()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn remote(&self) -> &PeerId {
        &self.shared.remote
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CallEvent> {
        self.shared.events.subscribe()
    }

    pub fn connection(&self) -> Option<Connection> {
        lock(&self.shared.slots).connection.clone()
    }

    pub fn local_tracks(&self) -> Vec<Arc<dyn LocalTrack>> {
        lock(&self.shared.slots).local_tracks.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Acquires local media and attaches it to the connection with the remote peer.
    ///
    /// A capture failure is reported once through `CallEvent::Error` and leaves no
    /// connection behind. Starting an already started call returns its connection;
    /// concurrent starts wait for the first one.
    pub async fn start(&self, options: MediaOptions) -> Result<Connection, PeerError> {
        let _starting = self.shared.starting.lock().await;

        if self.is_closed() {
            return Err(PeerError::Shutdown);
        }
        if let Some(connection) = self.connection() {
            return Ok(connection);
        }

        let tracks = match self.shared.provider.acquire(&options).await {
            Ok(tracks) => tracks,
            Err(e) => {
                let err = PeerError::Capture(format!("{e:#}"));
                warn!("Call to {} could not capture media: {}", self.remote(), err);
                self.shared.emit(CallEvent::Error(err.clone()));
                return Err(err);
            }
        };
        info!(
            "Call to {} acquired {} local track(s)",
            self.remote(),
            tracks.len()
        );

        if self.is_closed() {
            stop_all(&tracks);
            return Err(PeerError::Shutdown);
        }

        let connection = match self
            .shared
            .peer
            .connect_with_tracks(self.remote().clone(), tracks.clone())
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                stop_all(&tracks);
                self.shared.emit(CallEvent::Error(e.clone()));
                return Err(e);
            }
        };

        // `close` flips the flag before emptying the slots, so checking it under the
        // slot lock decides who releases this connection and these tracks.
        let stored = {
            let mut slots = lock(&self.shared.slots);
            if self.is_closed() {
                false
            } else {
                slots.aggregator = Some(self.spawn_aggregator(&connection));
                slots.local_tracks = tracks.clone();
                slots.connection = Some(connection.clone());
                true
            }
        };

        if !stored {
            connection.close().await;
            stop_all(&tracks);
            return Err(PeerError::Shutdown);
        }
        Ok(connection)
    }

    /// Closes the connection and stops every local track. Idempotent; `Close` fires once.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let (connection, tracks, aggregator) = {
            let mut slots = lock(&self.shared.slots);
            (
                slots.connection.take(),
                std::mem::take(&mut slots.local_tracks),
                slots.aggregator.take(),
            )
        };

        if let Some(aggregator) = aggregator {
            aggregator.abort();
        }
        if let Some(connection) = connection {
            connection.close().await;
        }
        stop_all(&tracks);

        info!("Call to {} closed", self.remote());
        self.shared.events.emit(CallEvent::Close);
    }

    fn spawn_aggregator(&self, connection: &Connection) -> JoinHandle<()> {
        let mut tracks_rx = connection.remote_tracks();
        let (close_tx, mut close_rx) = mpsc::unbounded_channel();
        connection.on_close(close_tx);

        let shared = self.shared.clone();
        tokio::spawn(async move {
            let mut stream = RemoteStream::default();
            loop {
                tokio::select! {
                    Some(group) = tracks_rx.recv() => {
                        if stream.merge(group) {
                            debug!("Call to {} now has {} remote track(s)", shared.remote, stream.len());
                            shared.emit(CallEvent::Stream(stream.clone()));
                        }
                    }
                    Some(_) = close_rx.recv() => shared.emit(CallEvent::Close),
                    else => break,
                }
            }
        })
    }
}

fn stop_all(tracks: &[Arc<dyn LocalTrack>]) {
    for track in tracks {
        track.stop();
    }
}
