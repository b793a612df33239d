use crate::model::negotiation::NegotiationPayload;
use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

/// Messages exchanged with the signaling relay, tagged by `type`.
///
/// A client sends `signal` with `target`; the relay forwards it to the target
/// with `target` replaced by `from`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayMessage {
    Register {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
    },
    Registered,
    Signal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<PeerId>,
        signal: NegotiationPayload,
    },
    Error {
        message: String,
    },
}

impl RelayMessage {
    /// Outbound signal addressed to `target`.
    pub fn signal_to(target: PeerId, signal: NegotiationPayload) -> Self {
        Self::Signal {
            from: None,
            target: Some(target),
            signal,
        }
    }

    /// Signal as delivered by the relay, stamped with its sender.
    pub fn signal_from(from: PeerId, signal: NegotiationPayload) -> Self {
        Self::Signal {
            from: Some(from),
            target: None,
            signal,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Registered => "registered",
            Self::Signal { .. } => "signal",
            Self::Error { .. } => "error",
        }
    }
}
