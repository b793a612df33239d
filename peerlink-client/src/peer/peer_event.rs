use peerlink_core::{PeerError, PeerId};

use crate::connection::Connection;

/// Peer-level lifecycle events.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// The relay confirmed registration; connections can be originated and accepted.
    Open,
    /// A remote peer opened negotiation with us. Attach handlers here.
    Connection(Connection),
    /// A connection was reported closed or its signaling path dropped.
    Disconnected(PeerId),
    /// The signaling relationship dropped or was closed locally.
    Close,
    Error(PeerError),
}
