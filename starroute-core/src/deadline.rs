//! Soft wall-clock deadline checked cooperatively by every search loop.

use std::time::{Duration, Instant};

/// A stopwatch with a time limit.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use starroute_core::Deadline;
///
/// let deadline = Deadline::new(Duration::from_secs(60));
/// assert!(!deadline.expired());
/// assert!(deadline.remaining() <= Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    /// Start a deadline that expires after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    /// Configured time limit.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time since the deadline was started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.elapsed())
    }

    /// Whether the time limit has passed.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.elapsed() > self.timeout
    }
}
