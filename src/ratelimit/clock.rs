//! Time source abstraction for the limiter.

use std::time::Instant;

/// A source of monotonic time.
///
/// The limiter reads time through this trait so tests can drive window
/// rollover deterministically instead of sleeping.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by the system's monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
