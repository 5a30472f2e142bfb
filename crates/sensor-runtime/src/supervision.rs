/// Supervision utilities for link operations
///
/// Provides timeout-based supervision so the link never sits forever in
/// DeviceFound or Connecting when a peripheral goes quiet mid-handshake.
use crate::LinkMessage;
use csc_protocol::LinkState;
use futures_channel::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle to cancel a timeout operation
///
/// When dropped or explicitly cancelled, the timeout task will not send
/// the timeout message, preventing spurious timeouts after operations complete.
#[derive(Clone)]
pub struct TimeoutHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimeoutHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel the timeout, preventing it from firing
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Drop for TimeoutHandle {
    fn drop(&mut self) {
        // Auto-cancel when handle is dropped
        self.cancel();
    }
}

/// Timeout configuration for supervised operations
pub struct SupervisionConfig {
    /// Timeout covering DeviceFound and Connecting, from connect request to
    /// services ready
    pub connect_timeout_secs: u64,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10, // 10s for connect + service discovery
        }
    }
}

/// Spawn a timeout task that sends a timeout message after the specified duration
///
/// Returns a TimeoutHandle that can be used to cancel the timeout. If the handle
/// is dropped or explicitly cancelled before the timeout fires, no message will
/// be sent. This prevents spurious timeout messages after operations complete.
pub fn spawn_timeout(
    link_tx: mpsc::Sender<LinkMessage>,
    operation: &str,
    current_state: LinkState,
    timeout_secs: u64,
) -> TimeoutHandle {
    let operation = operation.to_string();
    let handle = TimeoutHandle::new();
    let cancel_flag = handle.cancelled.clone();

    tokio::spawn(async move {
        // Wait for timeout duration with periodic cancellation checks
        // so cancelled tasks exit early instead of holding the sender
        let check_interval_ms = 500;
        let total_ms = timeout_secs * 1000;
        let mut elapsed_ms = 0;
        let mut link_tx = link_tx;

        while elapsed_ms < total_ms {
            // Check if cancelled (fast exit path)
            if cancel_flag.load(Ordering::Acquire) {
                return;
            }

            // Sleep for up to check_interval_ms
            let remaining_ms = total_ms - elapsed_ms;
            let sleep_ms = remaining_ms.min(check_interval_ms);
            tokio::time::sleep(tokio::time::Duration::from_millis(sleep_ms)).await;
            elapsed_ms += sleep_ms;
        }

        // Final check before sending timeout message
        if !cancel_flag.load(Ordering::Acquire) {
            let _ = link_tx.try_send(LinkMessage::OperationTimeout {
                operation,
                state: current_state,
            });
        }
    });

    handle
}
