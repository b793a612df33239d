use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use peerlink_client::{LocalTrack, MediaOptions, MediaProvider, TrackKind};

/// Track without an RTP source, enough for engines that only record what they get.
pub struct FakeTrack {
    id: String,
    kind: TrackKind,
    stopped: AtomicBool,
}

impl FakeTrack {
    pub fn new(id: &str, kind: TrackKind) -> Self {
        Self {
            id: id.to_owned(),
            kind,
            stopped: AtomicBool::new(false),
        }
    }
}

impl LocalTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Hands out one [`FakeTrack`] per requested kind, or fails every time.
#[derive(Default)]
pub struct FakeMediaProvider {
    fail: bool,
    acquisitions: AtomicUsize,
    issued: Mutex<Vec<Arc<FakeTrack>>>,
    gate: Option<Arc<Notify>>,
}

impl FakeMediaProvider {
    pub fn working() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    /// Every acquisition waits until the returned gate is notified.
    pub fn gated() -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(Self {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        (provider, gate)
    }

    /// Every track handed out so far.
    pub fn issued(&self) -> Vec<Arc<FakeTrack>> {
        self.issued.lock().unwrap().clone()
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProvider for FakeMediaProvider {
    async fn acquire(&self, options: &MediaOptions) -> Result<Vec<Arc<dyn LocalTrack>>> {
        let n = self.acquisitions.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            bail!("permission denied");
        }

        let mut fakes = Vec::new();
        if options.audio {
            fakes.push(Arc::new(FakeTrack::new(&format!("audio-{n}"), TrackKind::Audio)));
        }
        if options.video {
            fakes.push(Arc::new(FakeTrack::new(&format!("video-{n}"), TrackKind::Video)));
        }
        self.issued.lock().unwrap().extend(fakes.iter().cloned());

        Ok(fakes
            .into_iter()
            .map(|track| track as Arc<dyn LocalTrack>)
            .collect())
    }
}
