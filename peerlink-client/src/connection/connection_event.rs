use bytes::Bytes;
use peerlink_core::PeerError;

/// Events observable on a single [`Connection`](crate::Connection).
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The data channel is open; `send` delivers from now on.
    Open,
    Message(Bytes),
    /// Emitted exactly once, whatever caused the close.
    Close,
    /// Non-fatal: the connection keeps its state.
    Error(PeerError),
}
