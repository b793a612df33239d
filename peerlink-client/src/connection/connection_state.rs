use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRole {
    Offerer,
    Answerer,
}

/// Lifecycle of a connection to one remote peer.
///
/// `Created -> Negotiating(role) -> Open -> Closed`, with `Failed` reachable
/// from any live state when the engine gives up. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Created,
    Negotiating(ConnectionRole),
    Open,
    Closed,
    Failed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_become(&self, next: ConnectionState) -> bool {
        match (self, next) {
            (Self::Closed, _) => false,
            (current, next) if *current == next => false,
            (_, Self::Closed) => true,
            (Self::Failed, _) => false,
            (_, Self::Created) => false,
            (Self::Open, Self::Negotiating(_)) => false,
            _ => true,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Negotiating(ConnectionRole::Offerer) => f.write_str("negotiating (offerer)"),
            Self::Negotiating(ConnectionRole::Answerer) => f.write_str("negotiating (answerer)"),
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}
