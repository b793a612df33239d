use peerlink_core::IceCandidate;
use std::collections::VecDeque;

/// Remote candidates that arrived before any remote description was installed.
///
/// Holds candidates in arrival order until [`drain`](Self::drain) is called once;
/// from then on the queue no longer exists and `hold` hands candidates straight back.
#[derive(Debug)]
pub struct PendingSignalQueue {
    queue: Option<VecDeque<IceCandidate>>,
}

impl PendingSignalQueue {
    pub fn new() -> Self {
        Self {
            queue: Some(VecDeque::new()),
        }
    }

    /// Queues `candidate`, or returns it when the queue was already drained.
    pub fn hold(&mut self, candidate: IceCandidate) -> Result<(), IceCandidate> {
        match &mut self.queue {
            Some(queue) => {
                queue.push_back(candidate);
                Ok(())
            }
            None => Err(candidate),
        }
    }

    /// Takes everything held so far. Returns an empty list after the first call.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        self.queue.take().map(Vec::from).unwrap_or_default()
    }

    pub fn is_drained(&self) -> bool {
        self.queue.is_none()
    }

    pub fn len(&self) -> usize {
        self.queue.as_ref().map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingSignalQueue {
    fn default() -> Self {
        Self::new()
    }
}
