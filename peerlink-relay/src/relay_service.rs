use axum::extract::ws::Message;
use dashmap::DashMap;
use peerlink_core::{PeerId, RelayMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

#[derive(Default)]
struct RelayInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
}

/// Registry of connected peers, keyed by the id they registered under.
#[derive(Clone, Default)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `peer_id`; a later registration under the same id takes over.
    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) {
        if self.inner.peers.insert(peer_id.clone(), tx).is_some() {
            warn!("Peer {} re-registered, previous socket replaced", peer_id);
        }
    }

    /// Forgets `peer_id`, unless it has been taken over by another socket meanwhile.
    pub fn remove_peer(&self, peer_id: &PeerId, tx: &mpsc::UnboundedSender<Message>) {
        self.inner
            .peers
            .remove_if(peer_id, |_, current| current.same_channel(tx));
    }

    pub fn is_registered(&self, peer_id: &PeerId) -> bool {
        self.inner.peers.contains_key(peer_id)
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    /// Sends `msg` to `peer_id`. Returns false when the peer is not connected.
    pub fn send_to(&self, peer_id: &PeerId, msg: &RelayMessage) -> bool {
        let Some(peer) = self.inner.peers.get(peer_id) else {
            warn!("Attempted to relay {} to unknown peer {}", msg.type_tag(), peer_id);
            return false;
        };

        match serde_json::to_string(msg) {
            Ok(json) => {
                debug!("relay -> {}: {}", peer_id, msg.type_tag());
                peer.send(Message::Text(json.into())).is_ok()
            }
            Err(e) => {
                error!("Failed to serialize relay message: {}", e);
                false
            }
        }
    }
}
