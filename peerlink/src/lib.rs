pub use peerlink_core::model::PeerId;
pub use peerlink_core::{PeerError, TransportError};

pub mod model {
    pub use peerlink_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use peerlink_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use peerlink_relay::*;
}
