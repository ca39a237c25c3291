//! Download concurrency limiter.
//!
//! A semaphore shared by every tile fetch of an acquisition (and by several
//! acquisitions when the worker shares one limiter), so upstream providers
//! never see more than `max_concurrent` requests from this process.
//!
//! ```ignore
//! let limiter = Arc::new(DownloadLimiter::new(5));
//! let _permit = limiter.acquire().await;
//! // HTTP request happens here; the permit is released on drop
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Limiter for concurrent provider requests.
#[derive(Debug)]
pub struct DownloadLimiter {
    semaphore: Arc<Semaphore>,

    /// Maximum permits (for stats/debugging)
    max_permits: usize,

    /// Current number of in-flight requests
    in_flight: AtomicUsize,

    /// Peak concurrent requests observed
    peak_in_flight: AtomicUsize,
}

impl DownloadLimiter {
    /// Creates a limiter allowing `max_concurrent` requests; zero is raised to one.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_permits: max_concurrent,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Waits for a permit. Returns `None` only if the limiter was closed.
    pub async fn acquire(&self) -> Option<DownloadPermit<'_>> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);

        Some(DownloadPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    /// Returns the maximum number of concurrent requests allowed.
    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    /// Returns the current number of in-flight requests.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns the peak number of concurrent requests observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    /// Returns the number of available permits.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A permit for one provider request, released on drop.
pub struct DownloadPermit<'a> {
    _permit: OwnedSemaphorePermit,
    in_flight: &'a AtomicUsize,
}

impl Drop for DownloadPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
