//! Trailing-edge debounce
//!
//! Every call to [`Debouncer::run`] waits for the quiet interval and only
//! runs its operation if no newer call (or [`Debouncer::cancel`]) arrived in
//! the meantime. Superseded calls resolve to `None` without running.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Debounce timer shared by all callers of one input
#[derive(Debug)]
pub struct Debouncer {
    interval: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    /// Create a debouncer with the given quiet interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: AtomicU64::new(0),
        }
    }

    /// The quiet interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait out the interval, then run `op` unless superseded
    pub async fn run<F, Fut>(&self, op: F) -> Option<Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.interval).await;

        if self.generation.load(Ordering::SeqCst) != ticket {
            return None;
        }

        Some(op().await)
    }

    /// Drop any pending call without running it
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
