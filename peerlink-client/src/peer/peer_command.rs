use peerlink_core::PeerId;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::call::LocalTrack;
use crate::connection::Connection;

/// Commands from [`Peer`](crate::Peer) handles to the registry task.
pub(crate) enum PeerCommand {
    Register {
        id: PeerId,
    },

    Connect {
        remote: PeerId,
        tracks: Vec<Arc<dyn LocalTrack>>,
        reply: oneshot::Sender<Connection>,
    },

    GetConnection {
        remote: PeerId,
        reply: oneshot::Sender<Option<Connection>>,
    },

    Disconnect {
        remote: PeerId,
        reply: oneshot::Sender<()>,
    },

    CloseAll {
        reply: oneshot::Sender<()>,
    },

    LocalId {
        reply: oneshot::Sender<Option<PeerId>>,
    },

    ConnectionIds {
        reply: oneshot::Sender<Vec<PeerId>>,
    },
}
