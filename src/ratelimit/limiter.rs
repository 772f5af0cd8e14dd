//! Core fixed-window limiter implementation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};

/// Admission decision for inbound requests, one call per request.
///
/// On rejection the returned duration reports how long until the current
/// window resets; on admission it is `Duration::ZERO` and callers ignore it.
/// The check never fails and never blocks beyond the internal lock.
pub trait Limiter: Send + Sync {
    /// Decide whether a request from `client_key` is admitted within the
    /// current window.
    fn allow(&self, client_key: &str) -> (bool, Duration);
}

/// Counter table and the deadline it expires at.
struct Window {
    counters: HashMap<String, u32>,
    reset_at: Instant,
}

/// A fixed-window rate limiter with one process-global window.
///
/// All clients share the same window boundary. When the deadline passes,
/// the whole counter table is cleared and the deadline advances by exactly
/// one window length; entries are never pruned individually.
///
/// This struct is thread-safe and can be shared across tasks.
pub struct FixedWindowLimiter<C: Clock = SystemClock> {
    /// Maximum admitted requests per client per window.
    limit: u32,
    /// Length of each window.
    window: Duration,
    /// Guarded as one critical section: time check, rollover, increment
    /// and comparison must not interleave across callers.
    state: Mutex<Window>,
    clock: C,
}

impl FixedWindowLimiter {
    /// Create a limiter admitting `limit` requests per client per `window`.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, SystemClock)
    }
}

impl<C: Clock> FixedWindowLimiter<C> {
    /// Create a limiter reading time from a custom [`Clock`].
    ///
    /// This is primarily useful for testing or deterministic simulations.
    pub fn with_clock(limit: u32, window: Duration, clock: C) -> Self {
        let reset_at = clock.now() + window;
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                counters: HashMap::new(),
                reset_at,
            }),
            clock,
        }
    }

    /// Maximum admitted requests per client per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Length of each window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current count for `client_key`, if it was seen this window.
    pub fn current_count(&self, client_key: &str) -> Option<u32> {
        self.state.lock().counters.get(client_key).copied()
    }

    /// Number of distinct clients seen in the current window.
    pub fn tracked_clients(&self) -> usize {
        self.state.lock().counters.len()
    }
}

impl<C: Clock> Limiter for FixedWindowLimiter<C> {
    fn allow(&self, client_key: &str) -> (bool, Duration) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        // Rollover before counting, so a request landing exactly on the
        // deadline opens the new window. The deadline advances one window
        // length from its previous value, never from `now`.
        if now >= state.reset_at {
            state.counters.clear();
            state.reset_at += self.window;
        }

        let count = {
            let count = state.counters.entry(client_key.to_string()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };

        if count > self.limit {
            let retry_after = state.reset_at.saturating_duration_since(now);
            debug!(
                client = client_key,
                count,
                limit = self.limit,
                "rate limit exceeded"
            );
            return (false, retry_after);
        }

        trace!(client = client_key, count, "request admitted");
        (true, Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::super::clock::testing::ManualClock;
    use super::*;

    const WINDOW: Duration = Duration::from_secs(5);

    #[test]
    fn admits_up_to_the_limit() {
        let limiter = FixedWindowLimiter::new(3, WINDOW);

        for _ in 0..3 {
            let (allowed, _) = limiter.allow("10.0.0.1");
            assert!(allowed);
        }
    }

    #[test]
    fn rejects_past_the_limit() {
        let limiter = FixedWindowLimiter::new(3, WINDOW);

        let results: Vec<bool> = (0..5).map(|_| limiter.allow("10.0.0.1").0).collect();
        assert_eq!(results, vec![true, true, true, false, false]);
    }

    #[test]
    fn clients_have_independent_allowances() {
        let limiter = FixedWindowLimiter::new(3, WINDOW);

        for _ in 0..5 {
            limiter.allow("10.0.0.1");
        }

        // A's exhaustion must not eat into B's allowance.
        for _ in 0..3 {
            assert!(limiter.allow("10.0.0.2").0);
        }
        assert!(!limiter.allow("10.0.0.2").0);
    }

    #[test]
    fn interleaved_clients_see_their_own_budget() {
        let limiter = FixedWindowLimiter::new(3, WINDOW);

        let mut a = Vec::new();
        for i in 0..5 {
            a.push(limiter.allow("a").0);
            if i < 3 {
                assert!(limiter.allow("b").0);
            }
        }
        assert_eq!(a, vec![true, true, true, false, false]);
    }

    #[test]
    fn unknown_clients_start_from_zero() {
        let limiter = FixedWindowLimiter::new(2, WINDOW);

        assert_eq!(limiter.current_count("10.0.0.1"), None);
        limiter.allow("10.0.0.1");
        assert_eq!(limiter.current_count("10.0.0.1"), Some(1));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn rollover_resets_every_client() {
        let clock = ManualClock::new();
        let limiter = FixedWindowLimiter::with_clock(2, WINDOW, clock.clone());

        for _ in 0..3 {
            limiter.allow("a");
            limiter.allow("b");
        }
        assert!(!limiter.allow("a").0);
        assert!(!limiter.allow("b").0);

        clock.advance(WINDOW);

        assert!(limiter.allow("a").0);
        assert!(limiter.allow("b").0);
    }

    #[test]
    fn request_on_the_deadline_opens_the_new_window() {
        let clock = ManualClock::new();
        let limiter = FixedWindowLimiter::with_clock(1, WINDOW, clock.clone());

        assert!(limiter.allow("a").0);
        assert!(!limiter.allow("a").0);

        // Exactly at the deadline, not past it.
        clock.advance(WINDOW);
        assert!(limiter.allow("a").0);
    }

    #[test]
    fn retry_after_is_bounded_and_shrinks() {
        let clock = ManualClock::new();
        let window = Duration::from_secs(10);
        let limiter = FixedWindowLimiter::with_clock(1, window, clock.clone());

        assert!(limiter.allow("a").0);

        let (allowed, first) = limiter.allow("a");
        assert!(!allowed);
        assert!(first > Duration::ZERO);
        assert!(first <= window);

        clock.advance(Duration::from_secs(3));
        let (_, second) = limiter.allow("a");
        assert_eq!(second, Duration::from_secs(7));
        assert!(second < first);
    }

    #[test]
    fn idle_gap_resets_one_step_at_a_time() {
        let clock = ManualClock::new();
        let limiter = FixedWindowLimiter::with_clock(1, WINDOW, clock.clone());

        assert!(limiter.allow("a").0);
        assert!(!limiter.allow("a").0);

        // Sleep through three full windows. The deadline advances a single
        // step per observed rollover, so it lags behind "now" and the next
        // calls each clear a table holding only their own entry.
        clock.advance(WINDOW * 3);
        assert!(limiter.allow("a").0);
        assert!(limiter.allow("a").0);
        assert_eq!(limiter.current_count("a"), Some(1));
    }

    #[test]
    fn concurrent_callers_never_exceed_the_limit() {
        use std::sync::Arc;
        use std::thread;

        let limiter = Arc::new(FixedWindowLimiter::new(100, Duration::from_secs(60)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(thread::spawn(move || {
                let mut admitted = 0u32;
                for _ in 0..50 {
                    if limiter.allow("shared").0 {
                        admitted += 1;
                    }
                }
                admitted
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // The critical section makes the bound exact, not approximate.
        assert_eq!(total, 100);
    }
}
