use peerlink_core::{PeerError, RemoteTrack, RemoteTrackGroup};
use std::collections::BTreeMap;

/// Every remote track seen on a call, deduplicated by track id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteStream {
    tracks: BTreeMap<String, RemoteTrack>,
}

impl RemoteStream {
    /// Adds the tracks of `group`. Returns whether anything new was added.
    pub fn merge(&mut self, group: RemoteTrackGroup) -> bool {
        let before = self.tracks.len();
        for track in group {
            self.tracks.entry(track.id.clone()).or_insert(track);
        }
        self.tracks.len() != before
    }

    pub fn tracks(&self) -> impl Iterator<Item = &RemoteTrack> {
        self.tracks.values()
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.contains_key(track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    /// The aggregated remote stream changed.
    Stream(RemoteStream),
    Close,
    Error(PeerError),
}
