use thiserror::Error;

/// Failures of the signaling transport. Never fatal for the channel itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is not open")]
    NotOpen,

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("transport failure: {0}")]
    Io(String),

    #[error("relay reported: {0}")]
    Relay(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("signaling: {0}")]
    Transport(#[from] TransportError),

    #[error("negotiation [{context}]: {detail}")]
    Negotiation {
        context: &'static str,
        detail: String,
    },

    #[error("capture: {0}")]
    Capture(String),

    #[error("signaling reconnect gave up after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("peer has shut down")]
    Shutdown,
}

impl PeerError {
    pub fn negotiation(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Negotiation {
            context,
            detail: format!("{err:#}"),
        }
    }
}
