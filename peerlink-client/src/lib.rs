pub mod call;
pub mod connection;
pub mod observers;
pub mod peer;
pub mod signaling;
pub mod transport;

pub use call::*;
pub use connection::*;
pub use observers::Observers;
pub use peer::*;
pub use signaling::*;
pub use transport::*;

pub use peerlink_core::model::*;
pub use peerlink_core::{PeerError, TransportError};
