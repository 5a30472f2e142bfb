use csc_protocol::{ConnectionStatus, CscUpdate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Deliver-latest fan-out of measurements and connection status.
///
/// Built on watch channels: a subscriber that falls behind never queues stale
/// snapshots, it simply observes the most recent value when it next looks.
/// Status transitions are low-rate and also mirrored on the event stream,
/// where ordering is preserved.
///
/// Cloning is cheap and every clone publishes to the same subscribers.
#[derive(Clone)]
pub struct UpdatePublisher {
    inner: Arc<Inner>,
}

struct Inner {
    updates: watch::Sender<Option<CscUpdate>>,
    status: watch::Sender<ConnectionStatus>,
    // Closed while the link is stopped so late pipeline output is not
    // mistaken for live data
    gate: AtomicBool,
}

impl UpdatePublisher {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(None);
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            inner: Arc::new(Inner {
                updates,
                status,
                gate: AtomicBool::new(true),
            }),
        }
    }

    /// Publish a measurement snapshot. Dropped silently while paused.
    pub fn publish_update(&self, update: CscUpdate) {
        if self.inner.gate.load(Ordering::Acquire) {
            let _ = self.inner.updates.send(Some(update));
        }
    }

    /// Publish a connection status snapshot. Status always flows, paused or
    /// not: a stopped link still reports itself as disconnected.
    pub fn publish_status(&self, status: ConnectionStatus) {
        let _ = self.inner.status.send(status);
    }

    /// Subscribe to measurement snapshots. `None` until the first measurement
    /// of the session arrives.
    pub fn subscribe_updates(&self) -> watch::Receiver<Option<CscUpdate>> {
        self.inner.updates.subscribe()
    }

    /// Subscribe to connection status snapshots.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    /// Stop delivering measurements and clear the last one, so subscribers
    /// that look after a stop see no data rather than a stale reading.
    pub fn pause_updates(&self) {
        self.inner.gate.store(false, Ordering::Release);
        let _ = self.inner.updates.send(None);
    }

    /// Resume delivering measurements (called when a new session starts).
    pub fn resume_updates(&self) {
        self.inner.gate.store(true, Ordering::Release);
    }
}

impl Default for UpdatePublisher {
    fn default() -> Self {
        Self::new()
    }
}
