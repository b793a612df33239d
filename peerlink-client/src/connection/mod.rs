mod connection;
mod connection_event;
mod connection_state;
mod connection_task;
mod pending_signals;

pub use connection::*;
pub use connection_event::*;
pub use connection_state::*;
pub use pending_signals::*;

pub(crate) use connection_task::ConnectionInput;
