use peerlink_core::{RelayMessage, TransportError};

/// What a signaling channel reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// Transport session is up; sends will be attempted from now on.
    Open,
    /// Transport session dropped, for whatever reason. Terminal for that session only.
    Close,
    /// Non-fatal failure; the channel stays usable.
    Error(TransportError),
    /// A parsed relay message, one variant per relay `type` tag.
    Message(RelayMessage),
}
