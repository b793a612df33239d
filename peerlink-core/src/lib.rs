pub mod error;
pub mod model;

pub use error::{PeerError, TransportError};
pub use model::*;
