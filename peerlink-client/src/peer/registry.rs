use peerlink_core::{NegotiationPayload, PeerConfig, PeerError, PeerId, RelayMessage, TransportError};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Sleep, sleep};
use tracing::{debug, error, info, warn};

use crate::call::LocalTrack;
use crate::connection::{Connection, ConnectionInput, ConnectionRole};
use crate::observers::Observers;
use crate::peer::peer_command::PeerCommand;
use crate::peer::{PeerEvent, ReconnectBackoff};
use crate::signaling::{SignalingChannel, SignalingEvent};
use crate::transport::EngineFactory;

/// Owns the signaling channel and every connection of one local peer.
pub(crate) struct Registry {
    config: PeerConfig,
    factory: Arc<dyn EngineFactory>,
    signaling: SignalingChannel,
    signaling_rx: mpsc::UnboundedReceiver<SignalingEvent>,
    command_rx: mpsc::UnboundedReceiver<PeerCommand>,
    closed_tx: mpsc::UnboundedSender<PeerId>,
    closed_rx: mpsc::UnboundedReceiver<PeerId>,
    connections: HashMap<PeerId, Connection>,
    local_id: Option<PeerId>,
    backoff: ReconnectBackoff,
    exhausted: bool,
    reconnect: Option<Pin<Box<Sleep>>>,
    events: Arc<Observers<PeerEvent>>,
}

impl Registry {
    pub(crate) fn new(
        config: PeerConfig,
        factory: Arc<dyn EngineFactory>,
        signaling: SignalingChannel,
        signaling_rx: mpsc::UnboundedReceiver<SignalingEvent>,
        command_rx: mpsc::UnboundedReceiver<PeerCommand>,
        events: Arc<Observers<PeerEvent>>,
    ) -> Self {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let backoff = ReconnectBackoff::new(config.max_retries, config.retry_delay);

        Self {
            config,
            factory,
            signaling,
            signaling_rx,
            command_rx,
            closed_tx,
            closed_rx,
            connections: HashMap::new(),
            local_id: None,
            backoff,
            exhausted: false,
            reconnect: None,
            events,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Peer registry started for {}", self.config.server_url);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(c) => self.handle_command(c).await,
                    None => {
                        info!("All peer handles dropped. Shutting down registry.");
                        break;
                    }
                },

                Some(evt) = self.signaling_rx.recv() => self.handle_signaling_event(evt),

                Some(peer_id) = self.closed_rx.recv() => self.handle_closure(peer_id),

                () = wait_reconnect(&mut self.reconnect) => {
                    self.reconnect = None;
                    info!("Reconnecting to signaling relay (attempt {})", self.backoff.attempts());
                    self.signaling.connect();
                }
            }
        }

        self.shutdown().await;
        info!("Peer registry finished");
    }

    async fn handle_command(&mut self, cmd: PeerCommand) {
        match cmd {
            PeerCommand::Register { id } => {
                info!("Registering as {}", id);
                self.local_id = Some(id);
                self.backoff.reset();
                self.exhausted = false;
                self.reconnect = None;
                self.signaling.connect();
            }

            PeerCommand::Connect {
                remote,
                tracks,
                reply,
            } => {
                let connection = self.connect(remote, tracks);
                let _ = reply.send(connection);
            }

            PeerCommand::GetConnection { remote, reply } => {
                let _ = reply.send(self.connections.get(&remote).cloned());
            }

            PeerCommand::Disconnect { remote, reply } => {
                if let Some(connection) = self.connections.remove(&remote) {
                    info!("Disconnecting from {}", remote);
                    connection.close().await;
                }
                let _ = reply.send(());
            }

            PeerCommand::CloseAll { reply } => {
                self.shutdown().await;
                self.events.emit(PeerEvent::Close);
                let _ = reply.send(());
            }

            PeerCommand::LocalId { reply } => {
                let _ = reply.send(self.local_id.clone());
            }

            PeerCommand::ConnectionIds { reply } => {
                let mut ids: Vec<PeerId> = self.connections.keys().cloned().collect();
                ids.sort();
                let _ = reply.send(ids);
            }
        }
    }

    fn connect(&mut self, remote: PeerId, tracks: Vec<Arc<dyn LocalTrack>>) -> Connection {
        if let Some(existing) = self.live_connection(&remote) {
            debug!("Reusing connection to {}", remote);
            if !tracks.is_empty() {
                existing.attach_tracks(tracks);
            }
            return existing;
        }

        info!("Connecting to {}", remote);
        let mut initial = Vec::with_capacity(2);
        if !tracks.is_empty() {
            initial.push(ConnectionInput::AddTracks(tracks));
        }
        initial.push(ConnectionInput::Offer);

        self.create_connection(remote, ConnectionRole::Offerer, initial)
    }

    fn handle_signaling_event(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Open => {
                self.backoff.reset();
                self.exhausted = false;
                let Some(id) = self.local_id.clone() else {
                    return;
                };
                info!("Signaling open, registering {}", id);
                // A failed send is reported back through the channel's own error event.
                let _ = self.signaling.send(&RelayMessage::Register { peer_id: id });
            }

            SignalingEvent::Close => self.handle_signaling_close(),

            SignalingEvent::Error(e) => {
                warn!("Signaling error: {}", e);
                self.events.emit(PeerEvent::Error(PeerError::Transport(e)));
            }

            SignalingEvent::Message(message) => self.handle_relay_message(message),
        }
    }

    fn handle_relay_message(&mut self, message: RelayMessage) {
        match message {
            RelayMessage::Registered => {
                info!("Registered with relay");
                self.events.emit(PeerEvent::Open);
            }

            RelayMessage::Signal {
                from: Some(from),
                signal,
                ..
            } => self.route(from, signal),

            RelayMessage::Signal { from: None, .. } => {
                warn!("Dropping signal without sender");
            }

            RelayMessage::Error { message } => {
                warn!("Relay reported an error: {}", message);
                self.events.emit(PeerEvent::Error(PeerError::Transport(
                    TransportError::Relay(message),
                )));
            }

            RelayMessage::Register { .. } => {
                debug!("Ignoring register message from relay");
            }
        }
    }

    fn route(&mut self, from: PeerId, payload: NegotiationPayload) {
        if self.local_id.is_none() {
            debug!("Not registered, dropping {} from {}", payload.kind(), from);
            return;
        }

        debug!("Routing {} from {}", payload.kind(), from);
        let connection = match self.live_connection(&from) {
            Some(connection) => connection,
            None => {
                let connection =
                    self.create_connection(from, ConnectionRole::Answerer, Vec::new());
                self.events.emit(PeerEvent::Connection(connection.clone()));
                connection
            }
        };
        connection.deliver(payload);
    }

    fn handle_signaling_close(&mut self) {
        if self.local_id.is_none() {
            return;
        }

        warn!("Signaling connection lost");
        self.events.emit(PeerEvent::Close);
        for connection in self.connections.values() {
            connection.notify_disconnected();
        }

        match self.backoff.next_delay() {
            Some(delay) => {
                info!(
                    "Reconnect attempt {} of {} in {:?}",
                    self.backoff.attempts(),
                    self.backoff.max_retries(),
                    delay
                );
                self.reconnect = Some(Box::pin(sleep(delay)));
            }
            None if !self.exhausted => {
                self.exhausted = true;
                error!(
                    "Giving up on signaling after {} attempts",
                    self.backoff.max_retries()
                );
                self.events.emit(PeerEvent::Error(PeerError::ReconnectExhausted {
                    attempts: self.backoff.max_retries(),
                }));
            }
            None => {}
        }
    }

    fn handle_closure(&mut self, peer_id: PeerId) {
        info!("Connection to {} disconnected", peer_id);
        let closed = self
            .connections
            .get(&peer_id)
            .is_some_and(|connection| connection.state().is_closed());
        if closed {
            self.connections.remove(&peer_id);
        }
        self.events.emit(PeerEvent::Disconnected(peer_id));
    }

    fn live_connection(&self, peer_id: &PeerId) -> Option<Connection> {
        self.connections
            .get(peer_id)
            .filter(|connection| !connection.state().is_closed())
            .cloned()
    }

    fn create_connection(
        &mut self,
        peer_id: PeerId,
        role: ConnectionRole,
        initial: Vec<ConnectionInput>,
    ) -> Connection {
        let connection = Connection::spawn(
            peer_id.clone(),
            role,
            self.factory.clone(),
            self.config.rtc_config.clone(),
            self.signaling.clone(),
            initial,
        );
        connection.on_close(self.closed_tx.clone());
        self.connections.insert(peer_id, connection.clone());
        connection
    }

    /// Closes every connection and the signaling channel. The peer must register again.
    async fn shutdown(&mut self) {
        info!("Closing {} connection(s)", self.connections.len());
        for (_, connection) in self.connections.drain() {
            connection.close().await;
        }
        self.signaling.close();
        self.local_id = None;
        self.reconnect = None;
        self.backoff.reset();
        self.exhausted = false;
    }
}

async fn wait_reconnect(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
