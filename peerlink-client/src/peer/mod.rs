mod peer;
mod peer_command;
mod peer_event;
mod reconnect;
mod registry;

pub use peer::*;
pub use peer_event::*;
pub use reconnect::*;
