//! Per-connection fixed-window rate limiting.
//!
//! Every inbound message passes the limiter before any expensive work runs.
//! Each connection key owns an independent counter and window start; the
//! counter resets when the elapsed time since the window start exceeds the
//! window length. The table is shared across connection tasks, but windows
//! never mix between keys.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Default request capacity per window.
pub const DEFAULT_CAPACITY: u32 = 30;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

// ============================================================================
// Window
// ============================================================================

/// Counter and window start for one connection key.
struct Window {
    count: u32,
    started: Instant,
}

// ============================================================================
// RateLimiter
// ============================================================================

/// Fixed-window request limiter keyed by connection.
///
/// Created lazily per key on first use; a key's state is discarded via
/// [`RateLimiter::forget`] when its connection closes.
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    windows: Mutex<FxHashMap<SocketAddr, Window>>,
}

impl RateLimiter {
    /// Creates a limiter with the given capacity and window length.
    #[must_use]
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            windows: Mutex::new(FxHashMap::default()),
        }
    }

    /// Returns `true` if the key may proceed, incrementing its counter.
    ///
    /// Denied calls do not increment; the client retries after the window
    /// rolls over.
    pub fn allow(&self, key: SocketAddr) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Clock-injected variant of [`RateLimiter::allow`].
    fn allow_at(&self, key: SocketAddr, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        let window = windows.entry(key).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(window.started) > self.window {
            window.count = 0;
            window.started = now;
        }

        if window.count >= self.capacity {
            debug!(%key, capacity = self.capacity, "rate limit exceeded");
            return false;
        }

        window.count += 1;
        true
    }

    /// Discards the key's window state.
    ///
    /// Called when the connection closes.
    pub fn forget(&self, key: SocketAddr) {
        self.windows.lock().remove(&key);
    }

    /// Number of keys currently tracked.
    #[inline]
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.windows.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_WINDOW)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().expect("valid addr")
    }

    #[test]
    fn test_allows_up_to_capacity_then_denies() {
        let limiter = RateLimiter::default();
        let now = Instant::now();

        for _ in 0..DEFAULT_CAPACITY {
            assert!(limiter.allow_at(key(1000), now));
        }
        assert!(!limiter.allow_at(key(1000), now));
        assert!(!limiter.allow_at(key(1000), now));
    }

    #[test]
    fn test_window_reset_restores_budget() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        let start = Instant::now();

        assert!(limiter.allow_at(key(1001), start));
        assert!(limiter.allow_at(key(1001), start));
        assert!(!limiter.allow_at(key(1001), start));

        // Just past the window: counter resets and counting restarts.
        let later = start + Duration::from_millis(1001);
        assert!(limiter.allow_at(key(1001), later));
        assert!(limiter.allow_at(key(1001), later));
        assert!(!limiter.allow_at(key(1001), later));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        let now = Instant::now();

        assert!(limiter.allow_at(key(2000), now));
        assert!(!limiter.allow_at(key(2000), now));

        // A different connection still has its own budget.
        assert!(limiter.allow_at(key(2001), now));
    }

    #[test]
    fn test_forget_discards_state() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        let now = Instant::now();

        assert!(limiter.allow_at(key(3000), now));
        assert!(!limiter.allow_at(key(3000), now));
        assert_eq!(limiter.tracked(), 1);

        limiter.forget(key(3000));
        assert_eq!(limiter.tracked(), 0);

        // Fresh window after reconnect.
        assert!(limiter.allow_at(key(3000), now));
    }

    #[test]
    fn test_denied_calls_do_not_extend_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        let start = Instant::now();

        assert!(limiter.allow_at(key(4000), start));
        // Denials inside the window leave the window start untouched.
        assert!(!limiter.allow_at(key(4000), start + Duration::from_millis(900)));

        let after = start + Duration::from_millis(1100);
        assert!(limiter.allow_at(key(4000), after));
    }
}
