use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SdpRole {
    Offer,
    Answer,
}

/// Session description as exchanged through the relay: `{ "type": "offer", "sdp": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub role: SdpRole,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            role: SdpRole::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            role: SdpRole::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A network path candidate in the browser `RTCIceCandidateInit` JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }

    /// Stable serialization used as the dedup key for applied candidates.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{}|{:?}|{:?}|{:?}",
                self.candidate, self.sdp_mid, self.sdp_m_line_index, self.username_fragment
            )
        })
    }
}

/// The `signal` field of a relay `signal` message.
///
/// On the wire this is either a session description object or `{ "candidate": {...} }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NegotiationPayload {
    Description(SessionDescription),
    Candidate { candidate: IceCandidate },
}

impl NegotiationPayload {
    pub fn candidate(candidate: IceCandidate) -> Self {
        Self::Candidate { candidate }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Description(desc) => match desc.role {
                SdpRole::Offer => "offer",
                SdpRole::Answer => "answer",
            },
            Self::Candidate { .. } => "candidate",
        }
    }
}
