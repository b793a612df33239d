mod config;
mod media;
mod negotiation;
mod peer;
mod signaling;

pub use config::{ConfigError, IceServerConfig, PeerConfig, RtcConfig};
pub use media::{MediaOptions, RemoteTrack, RemoteTrackGroup, TrackKind};
pub use negotiation::{IceCandidate, NegotiationPayload, SdpRole, SessionDescription};
pub use peer::PeerId;
pub use signaling::RelayMessage;
