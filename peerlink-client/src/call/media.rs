use anyhow::{Result, bail};
use async_trait::async_trait;
use peerlink_core::{MediaOptions, TrackKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// A locally produced media track that can be attached to a connection.
pub trait LocalTrack: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    /// Releases the underlying capture resource. Idempotent.
    fn stop(&self);

    fn is_stopped(&self) -> bool;

    /// RTP source for engines that send real media.
    fn rtp_track(&self) -> Option<Arc<dyn TrackLocal + Send + Sync>> {
        None
    }
}

/// Acquires local media on behalf of a call.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    async fn acquire(&self, options: &MediaOptions) -> Result<Vec<Arc<dyn LocalTrack>>>;
}

/// Static-sample track: the application pushes encoded samples into [`SampleTrack::rtp`].
pub struct SampleTrack {
    id: String,
    kind: TrackKind,
    rtp: Arc<TrackLocalStaticSample>,
    stopped: AtomicBool,
}

impl SampleTrack {
    pub fn new(kind: TrackKind, stream_id: impl Into<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        let mime_type = match kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let (clock_rate, channels) = match kind {
            TrackKind::Audio => (48000, 2),
            TrackKind::Video => (90000, 0),
        };

        let rtp = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                clock_rate,
                channels,
                ..Default::default()
            },
            id.clone(),
            stream_id.into(),
        ));

        Self {
            id,
            kind,
            rtp,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn rtp(&self) -> &Arc<TrackLocalStaticSample> {
        &self.rtp
    }
}

impl LocalTrack for SampleTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Stopped local {:?} track {}", self.kind, self.id);
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn rtp_track(&self) -> Option<Arc<dyn TrackLocal + Send + Sync>> {
        Some(self.rtp.clone())
    }
}

/// Media provider that needs no capture device: one [`SampleTrack`] per requested kind.
#[derive(Debug, Clone)]
pub struct SyntheticMediaProvider {
    stream_id: String,
}

impl SyntheticMediaProvider {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
        }
    }
}

impl Default for SyntheticMediaProvider {
    fn default() -> Self {
        Self::new("peerlink")
    }
}

#[async_trait]
impl MediaProvider for SyntheticMediaProvider {
    async fn acquire(&self, options: &MediaOptions) -> Result<Vec<Arc<dyn LocalTrack>>> {
        if !options.audio && !options.video {
            bail!("neither audio nor video requested");
        }

        let mut tracks: Vec<Arc<dyn LocalTrack>> = Vec::new();
        if options.audio {
            tracks.push(Arc::new(SampleTrack::new(TrackKind::Audio, &self.stream_id)));
        }
        if options.video {
            tracks.push(Arc::new(SampleTrack::new(TrackKind::Video, &self.stream_id)));
        }
        Ok(tracks)
    }
}
