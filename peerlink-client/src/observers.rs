use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Typed observer registry: every subscriber gets its own ordered copy of each event.
///
/// Subscribers whose receiver was dropped are pruned on the next emit.
pub struct Observers<E> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<E>>>,
}

impl<E: Clone> Observers<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attach(tx);
        rx
    }

    pub fn attach(&self, tx: mpsc::UnboundedSender<E>) {
        self.lock().push(tx);
    }

    /// Attaches `tx` unless `finished` holds, checked under the subscriber lock.
    ///
    /// An emitter that changes its state before emitting therefore either reaches
    /// `tx` or is seen as finished here, never neither. Hands `tx` back when finished.
    pub fn attach_unless(
        &self,
        tx: mpsc::UnboundedSender<E>,
        finished: impl FnOnce() -> bool,
    ) -> Result<(), mpsc::UnboundedSender<E>> {
        let mut subscribers = self.lock();
        if finished() {
            return Err(tx);
        }
        subscribers.push(tx);
        Ok(())
    }

    pub fn emit(&self, event: E) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<E>>> {
        lock(&self.subscribers)
    }
}

/// Lock that shrugs off poisoning; every guarded value here stays consistent across panics.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<E: Clone> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}
