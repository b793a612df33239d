use peerlink_core::{PeerConfig, PeerError, PeerId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::call::{Call, LocalTrack, MediaProvider};
use crate::connection::Connection;
use crate::observers::Observers;
use crate::peer::PeerEvent;
use crate::peer::peer_command::PeerCommand;
use crate::peer::registry::Registry;
use crate::signaling::{RelayConnector, SignalingChannel, WebSocketConnector};
use crate::transport::{EngineFactory, RtcEngineFactory};

/// The local endpoint: registers with the relay and owns one connection per remote peer.
///
/// `Peer` is a handle to a registry task; clones share it. The task stops once
/// every handle is dropped, closing all connections on the way out.
///
/// ```no_run
/// # async fn demo() -> Result<(), peerlink_core::PeerError> {
/// use peerlink_client::{Peer, PeerConfig, PeerEvent};
///
/// let peer = Peer::new(PeerConfig::new("ws://localhost:3000"));
/// let mut events = peer.subscribe();
/// peer.register("alice")?;
///
/// while let Some(event) = events.recv().await {
///     if let PeerEvent::Open = event {
///         let bob = peer.connect("bob").await?;
///         bob.send("hello").await;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Peer {
    commands: mpsc::UnboundedSender<PeerCommand>,
    events: Arc<Observers<PeerEvent>>,
}

impl Peer {
    /// Peer over WebSocket signaling and webrtc-rs. Must be called inside a tokio runtime.
    pub fn new(config: PeerConfig) -> Self {
        Self::with_parts(config, Arc::new(WebSocketConnector), Arc::new(RtcEngineFactory))
    }

    pub fn with_parts(
        config: PeerConfig,
        connector: Arc<dyn RelayConnector>,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        let (signaling, signaling_rx) = SignalingChannel::new(config.server_url.clone(), connector);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let events = Arc::new(Observers::new());

        let registry = Registry::new(
            config,
            factory,
            signaling,
            signaling_rx,
            command_rx,
            events.clone(),
        );
        tokio::spawn(registry.run());

        Self { commands, events }
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PeerEvent> {
        self.events.subscribe()
    }

    /// Connects to the relay and registers under `id`. `PeerEvent::Open` follows on success.
    pub fn register(&self, id: impl Into<PeerId>) -> Result<(), PeerError> {
        self.post(PeerCommand::Register { id: id.into() })
    }

    /// Returns the connection to `remote`, creating it and sending an offer if none exists.
    pub async fn connect(&self, remote: impl Into<PeerId>) -> Result<Connection, PeerError> {
        self.connect_with_tracks(remote.into(), Vec::new()).await
    }

    pub(crate) async fn connect_with_tracks(
        &self,
        remote: PeerId,
        tracks: Vec<Arc<dyn LocalTrack>>,
    ) -> Result<Connection, PeerError> {
        self.request(|reply| PeerCommand::Connect {
            remote,
            tracks,
            reply,
        })
        .await
    }

    pub async fn get_connection(&self, remote: &PeerId) -> Option<Connection> {
        let remote = remote.clone();
        self.request(|reply| PeerCommand::GetConnection { remote, reply })
            .await
            .ok()
            .flatten()
    }

    /// Closes and forgets the connection to `remote`, if any.
    pub async fn disconnect(&self, remote: &PeerId) -> Result<(), PeerError> {
        let remote = remote.clone();
        self.request(|reply| PeerCommand::Disconnect { remote, reply })
            .await
    }

    /// Closes every connection and the signaling channel, then emits `Close`.
    pub async fn close_all(&self) -> Result<(), PeerError> {
        self.request(|reply| PeerCommand::CloseAll { reply }).await
    }

    /// The id passed to [`register`](Self::register), until `close_all`.
    pub async fn local_id(&self) -> Option<PeerId> {
        self.request(|reply| PeerCommand::LocalId { reply })
            .await
            .ok()
            .flatten()
    }

    /// Remote peers with a connection in the registry, sorted.
    pub async fn connection_ids(&self) -> Vec<PeerId> {
        self.request(|reply| PeerCommand::ConnectionIds { reply })
            .await
            .unwrap_or_default()
    }

    /// A media call towards `remote`. Nothing happens until [`Call::start`].
    pub fn call(&self, remote: impl Into<PeerId>, provider: Arc<dyn MediaProvider>) -> Call {
        Call::new(self.clone(), remote.into(), provider)
    }

    fn post(&self, command: PeerCommand) -> Result<(), PeerError> {
        self.commands.send(command).map_err(|_| PeerError::Shutdown)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> PeerCommand,
    ) -> Result<T, PeerError> {
        let (tx, rx) = oneshot::channel();
        self.post(command(tx))?;
        rx.await.map_err(|_| PeerError::Shutdown)
    }
}
