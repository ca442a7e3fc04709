//! Fixed-window rate limiter guarding the ingestion path.
//!
//! One counter per client key (typically the source address). A window
//! opens on the first request and expires `window_secs` later; expiry is
//! lazy — a key with no traffic simply resets on next use, there is no
//! background sweep. The read-increment-check is atomic per key: the
//! whole map sits behind one mutex, so two simultaneous requests from
//! the same client can never both slip past the threshold.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Prune stale windows once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 1024;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Over the threshold; retry after this many whole seconds.
    Denied { retry_after_secs: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Per-client fixed-window request counter.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    /// Creates a limiter admitting at most `max_requests` per
    /// `window_secs`-second window per key.
    pub fn new(window_secs: u64, max_requests: u32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window: Duration::seconds(window_secs as i64),
            max_requests,
        }
    }

    /// Checks and counts a request from `key` at wall-clock time.
    pub fn allow(&self, key: &str) -> Decision {
        self.check(key, Utc::now())
    }

    /// Checks and counts a request from `key` at an explicit instant.
    /// The explicit clock keeps window expiry testable under simulated
    /// time.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> Decision {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Rate limiter lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        match windows.get_mut(key) {
            Some(window) if now - window.started_at < self.window => {
                window.count += 1;
                if window.count > self.max_requests {
                    let remaining = window.started_at + self.window - now;
                    log::debug!(
                        "Rate limit exceeded for '{}': {} requests in window",
                        key,
                        window.count
                    );
                    Decision::Denied {
                        retry_after_secs: seconds_ceil(remaining),
                    }
                } else {
                    Decision::Allowed
                }
            }
            _ => {
                // New key, or a window that lapsed with no traffic —
                // lazy reset on first use.
                if windows.len() >= PRUNE_THRESHOLD {
                    let window = self.window;
                    windows.retain(|_, w| now - w.started_at < window);
                }
                windows.insert(
                    key.to_string(),
                    Window {
                        started_at: now,
                        count: 1,
                    },
                );
                if self.max_requests == 0 {
                    Decision::Denied {
                        retry_after_secs: seconds_ceil(self.window),
                    }
                } else {
                    Decision::Allowed
                }
            }
        }
    }
}

/// Rounds a duration up to whole seconds, floored at zero.
fn seconds_ceil(d: Duration) -> u64 {
    let ms = d.num_milliseconds().max(0);
    ((ms + 999) / 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_threshold_boundary() {
        let limiter = RateLimiter::new(3600, 100);
        let now = t0();

        for _ in 0..100 {
            assert_eq!(limiter.check("1.2.3.4", now), Decision::Allowed);
        }
        // The 101st call in the same window is denied with the full
        // window remaining.
        assert_eq!(
            limiter.check("1.2.3.4", now),
            Decision::Denied {
                retry_after_secs: 3600
            }
        );
    }

    #[test]
    fn test_retry_after_shrinks_as_window_ages() {
        let limiter = RateLimiter::new(3600, 1);
        let start = t0();
        assert_eq!(limiter.check("k", start), Decision::Allowed);

        let later = start + Duration::seconds(1000);
        assert_eq!(
            limiter.check("k", later),
            Decision::Denied {
                retry_after_secs: 2600
            }
        );
    }

    #[test]
    fn test_window_resets_lazily_after_expiry() {
        let limiter = RateLimiter::new(3600, 2);
        let start = t0();

        assert_eq!(limiter.check("k", start), Decision::Allowed);
        assert_eq!(limiter.check("k", start), Decision::Allowed);
        assert!(matches!(
            limiter.check("k", start),
            Decision::Denied { .. }
        ));

        // Past the window: counter resets on next use.
        let after = start + Duration::seconds(3601);
        assert_eq!(limiter.check("k", after), Decision::Allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(3600, 1);
        let now = t0();

        assert_eq!(limiter.check("a", now), Decision::Allowed);
        assert!(matches!(limiter.check("a", now), Decision::Denied { .. }));
        // A different client is unaffected.
        assert_eq!(limiter.check("b", now), Decision::Allowed);
    }

    #[test]
    fn test_concurrent_checks_respect_threshold() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(3600, 50));
        let now = t0();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    let mut admitted = 0u32;
                    for _ in 0..25 {
                        if limiter.check("shared", now) == Decision::Allowed {
                            admitted += 1;
                        }
                    }
                    admitted
                })
            })
            .collect();

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 100 attempts against a threshold of 50: exactly 50 admitted,
        // never more, regardless of interleaving.
        assert_eq!(total, 50);
    }

    #[test]
    fn test_zero_threshold_denies_everything() {
        let limiter = RateLimiter::new(60, 0);
        assert!(matches!(
            limiter.check("k", t0()),
            Decision::Denied { .. }
        ));
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let limiter = RateLimiter::new(10, 1);
        let start = t0();
        assert_eq!(limiter.check("k", start), Decision::Allowed);

        let later = start + Duration::milliseconds(9500);
        assert_eq!(
            limiter.check("k", later),
            Decision::Denied {
                retry_after_secs: 1
            }
        );
    }
}
