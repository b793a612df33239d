use anyhow::Error;
use peerlink_core::{
    IceCandidate, NegotiationPayload, PeerError, RelayMessage, RtcConfig, SdpRole,
    SessionDescription,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::call::LocalTrack;
use crate::connection::connection::ConnectionShared;
use crate::connection::{ConnectionEvent, ConnectionRole, ConnectionState, PendingSignalQueue};
use crate::signaling::SignalingChannel;
use crate::transport::{EngineEvent, EngineFactory, NegotiationEngine};

const DATA_CHANNEL_LABEL: &str = "data";

/// Work items for a connection task, applied one at a time in arrival order.
pub(crate) enum ConnectionInput {
    Remote(NegotiationPayload),
    AddTracks(Vec<Arc<dyn LocalTrack>>),
    Offer,
    Shutdown,
}

struct ConnectionTask {
    shared: Arc<ConnectionShared>,
    engine: Arc<dyn NegotiationEngine>,
    signaling: SignalingChannel,
    applied_candidates: HashSet<String>,
    pending: PendingSignalQueue,
}

pub(crate) async fn run(
    shared: Arc<ConnectionShared>,
    factory: Arc<dyn EngineFactory>,
    rtc_config: RtcConfig,
    signaling: SignalingChannel,
    mut inbox: mpsc::UnboundedReceiver<ConnectionInput>,
) {
    let (engine_tx, mut engine_rx) = mpsc::unbounded_channel();
    let engine = match factory.create(&rtc_config, engine_tx).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to create engine for {}: {:#}", shared.peer_id, e);
            if shared.transition(ConnectionState::Failed) {
                shared.events.emit(ConnectionEvent::Error(PeerError::negotiation(
                    "create-engine",
                    e,
                )));
            }
            return;
        }
    };

    if !shared.install_engine(engine.clone()) {
        let _ = engine.close().await;
        return;
    }

    let mut task = ConnectionTask {
        shared,
        engine,
        signaling,
        applied_candidates: HashSet::new(),
        pending: PendingSignalQueue::new(),
    };

    debug!("Connection task for {} started", task.shared.peer_id);

    loop {
        tokio::select! {
            input = inbox.recv() => match input {
                Some(ConnectionInput::Shutdown) | None => break,
                Some(input) => task.handle_input(input).await,
            },

            Some(event) = engine_rx.recv() => task.handle_engine_event(event),
        }

        if task.shared.is_closed() {
            break;
        }
    }

    task.shared.release().await;
    debug!("Connection task for {} finished", task.shared.peer_id);
}

impl ConnectionTask {
    async fn handle_input(&mut self, input: ConnectionInput) {
        match input {
            ConnectionInput::Remote(NegotiationPayload::Description(desc)) => {
                self.apply_description(desc).await
            }
            ConnectionInput::Remote(NegotiationPayload::Candidate { candidate }) => {
                self.receive_candidate(candidate).await
            }
            ConnectionInput::AddTracks(tracks) => self.add_tracks(tracks).await,
            ConnectionInput::Offer => self.offer().await,
            ConnectionInput::Shutdown => {}
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::LocalCandidate(candidate) => {
                self.signal(NegotiationPayload::candidate(candidate));
            }

            EngineEvent::DataChannel(channel) => {
                debug!(
                    "Received data channel '{}' from {}",
                    channel.label(),
                    self.shared.peer_id
                );
                self.shared.set_channel(channel);
            }

            EngineEvent::ChannelOpen => {
                if self.shared.transition(ConnectionState::Open) {
                    self.shared.events.emit(ConnectionEvent::Open);
                }
            }

            EngineEvent::ChannelMessage(data) => {
                self.shared.events.emit(ConnectionEvent::Message(data));
            }

            EngineEvent::ChannelClosed => {
                info!("Data channel to {} closed", self.shared.peer_id);
                self.shared.finish();
            }

            EngineEvent::ChannelError(detail) => {
                self.report("data-channel", Error::msg(detail));
            }

            EngineEvent::RemoteTracks(group) => {
                self.shared.tracks.emit(group);
            }

            EngineEvent::Failed(detail) => {
                error!("Engine for {} failed: {}", self.shared.peer_id, detail);
                if self.shared.transition(ConnectionState::Failed) {
                    self.report("connection", Error::msg(detail));
                }
            }
        }
    }

    async fn offer(&mut self) {
        if self.shared.channel().is_none() {
            match self.engine.create_data_channel(DATA_CHANNEL_LABEL).await {
                Ok(channel) => self.shared.set_channel(channel),
                Err(e) => return self.report("create-data-channel", e),
            }
        }
        if self.shared.is_closed() {
            return;
        }

        let offer = match self.engine.create_offer().await {
            Ok(offer) => offer,
            Err(e) => return self.report("create-offer", e),
        };
        if self.shared.is_closed() {
            return;
        }

        if let Err(e) = self.engine.set_local_description(offer.clone()).await {
            return self.report("set-local-description", e);
        }
        if self.shared.is_closed() {
            return;
        }

        self.signal(NegotiationPayload::Description(offer));
        self.shared.begin_negotiating(ConnectionRole::Offerer);
    }

    async fn apply_description(&mut self, desc: SessionDescription) {
        let role = desc.role;
        debug!("Applying remote {:?} from {}", role, self.shared.peer_id);

        if let Err(e) = self.engine.set_remote_description(desc).await {
            return self.report("set-remote-description", e);
        }
        if self.shared.is_closed() {
            return;
        }

        for candidate in self.pending.drain() {
            self.apply_candidate(candidate).await;
            if self.shared.is_closed() {
                return;
            }
        }

        if role != SdpRole::Offer {
            return;
        }

        let answer = match self.engine.create_answer().await {
            Ok(answer) => answer,
            Err(e) => return self.report("create-answer", e),
        };
        if self.shared.is_closed() {
            return;
        }

        if let Err(e) = self.engine.set_local_description(answer.clone()).await {
            return self.report("set-local-description", e);
        }
        if self.shared.is_closed() {
            return;
        }

        self.signal(NegotiationPayload::Description(answer));
        self.shared.begin_negotiating(ConnectionRole::Answerer);
    }

    async fn receive_candidate(&mut self, candidate: IceCandidate) {
        if !self.applied_candidates.insert(candidate.fingerprint()) {
            debug!("Ignoring duplicate candidate from {}", self.shared.peer_id);
            return;
        }

        match self.pending.hold(candidate) {
            Ok(()) => debug!(
                "Holding candidate from {} until a remote description is set",
                self.shared.peer_id
            ),
            Err(candidate) => self.apply_candidate(candidate).await,
        }
    }

    async fn apply_candidate(&mut self, candidate: IceCandidate) {
        if let Err(e) = self.engine.add_ice_candidate(candidate).await {
            self.report("add-ice-candidate", e);
        }
    }

    async fn add_tracks(&mut self, tracks: Vec<Arc<dyn LocalTrack>>) {
        for track in tracks {
            if let Err(e) = self.engine.add_track(track).await {
                self.report("add-track", e);
            }
            if self.shared.is_closed() {
                return;
            }
        }
    }

    fn signal(&self, payload: NegotiationPayload) {
        let kind = payload.kind();
        let message = RelayMessage::signal_to(self.shared.peer_id.clone(), payload);
        match self.signaling.send(&message) {
            Ok(()) => debug!("Sent {} to {}", kind, self.shared.peer_id),
            Err(e) => warn!("Could not signal {} to {}: {}", kind, self.shared.peer_id, e),
        }
    }

    fn report(&self, context: &'static str, err: Error) {
        if self.shared.is_closed() {
            debug!("Ignoring {} failure on closed connection: {:#}", context, err);
            return;
        }
        warn!(
            "Connection to {} failed at {}: {:#}",
            self.shared.peer_id, context, err
        );
        self.shared
            .events
            .emit(ConnectionEvent::Error(PeerError::negotiation(context, err)));
    }
}
