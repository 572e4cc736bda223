//! Turn cancellation signal shared between the key listener and the session.
//!
//! The flag is sticky: once requested it stays set until the turn that
//! consumes it calls [`CancellationSignal::clear`]. A request that lands
//! between two turns therefore cancels the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct CancellationSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl CancellationSignal {
    pub fn new() -> Self { Self::default() }

    /// Request cancellation. Idempotent; safe from any thread.
    pub fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            tracing::debug!("Cancellation requested");
        }
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Return to neutral. Only the turn owner calls this, at a turn boundary.
    pub fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Resolve once cancellation has been requested (immediately if it already is).
    pub async fn requested(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent request() is not missed.
            notified.as_mut().enable();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}
