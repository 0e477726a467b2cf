//! Fixed-window rate limiting
//!
//! A coarse abuse deterrent, not a correctness mechanism: counters live in
//! process memory and reset on restart. The limiter is injected as a trait
//! object so call sites are untouched if a shared store replaces it in a
//! multi-instance deployment.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Admission decision for one request against a client key
pub trait RateLimiter: Send + Sync {
    /// Consume one point for `key`; `false` means the quota is exhausted.
    fn try_consume(&self, key: &str) -> bool;
}

#[derive(Debug)]
struct WindowSlot {
    count: u32,
    window_start: Instant,
}

/// In-memory fixed-window counter keyed by client address.
///
/// Each key gets `points` admissions per `window`; the counter resets when
/// the window elapses. Stale entries are pruned while the map lock is held,
/// bounding memory to keys seen within the last window.
pub struct FixedWindowLimiter {
    points: u32,
    window: Duration,
    slots: Mutex<HashMap<String, WindowSlot>>,
}

impl FixedWindowLimiter {
    pub fn new(points: u32, window: Duration) -> Self {
        Self {
            points,
            window,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &crate::config::RateLimitConfig) -> Self {
        Self::new(config.points, Duration::from_secs(config.window_secs))
    }

    fn consume_at(&self, key: &str, now: Instant) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());

        slots.retain(|_, slot| now.duration_since(slot.window_start) < self.window);

        let slot = slots.entry(key.to_string()).or_insert(WindowSlot {
            count: 0,
            window_start: now,
        });

        if slot.count >= self.points {
            return false;
        }
        slot.count += 1;
        true
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn try_consume(&self, key: &str) -> bool {
        self.consume_at(key, Instant::now())
    }
}
