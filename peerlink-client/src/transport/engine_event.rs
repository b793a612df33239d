use bytes::Bytes;
use peerlink_core::{IceCandidate, RemoteTrackGroup};
use std::fmt;
use std::sync::Arc;

use crate::transport::DataChannel;

/// Everything a negotiation engine reports asynchronously to the connection that owns it.
pub enum EngineEvent {
    /// A locally discovered path candidate, to be signaled to the remote side.
    LocalCandidate(IceCandidate),
    /// The remote side opened a data channel towards us.
    DataChannel(Arc<dyn DataChannel>),
    ChannelOpen,
    ChannelMessage(Bytes),
    ChannelClosed,
    ChannelError(String),
    RemoteTracks(RemoteTrackGroup),
    /// The engine gave up on the direct path.
    Failed(String),
}

impl fmt::Debug for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalCandidate(c) => f.debug_tuple("LocalCandidate").field(c).finish(),
            Self::DataChannel(dc) => f.debug_tuple("DataChannel").field(&dc.label()).finish(),
            Self::ChannelOpen => f.write_str("ChannelOpen"),
            Self::ChannelMessage(data) => {
                f.debug_tuple("ChannelMessage").field(&data.len()).finish()
            }
            Self::ChannelClosed => f.write_str("ChannelClosed"),
            Self::ChannelError(e) => f.debug_tuple("ChannelError").field(e).finish(),
            Self::RemoteTracks(tracks) => f.debug_tuple("RemoteTracks").field(tracks).finish(),
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}
