//! Fixed-window admission control.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// On rejection, how long until the current window rolls over.
    pub retry_after: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start_ms: i64,
    count: u32,
}

/// Fixed-window counter keyed by operation label.
///
/// Windows are wall-clock aligned, and the count never exceeds the ceiling
/// within a window: admission is a single check-and-increment inside the
/// lock, so concurrent callers cannot overshoot. The upload pipeline shares
/// one label, meaning the budget is global rather than per-caller.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    ceiling: u32,
    window: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl FixedWindowLimiter {
    pub fn new(ceiling: u32, window: Duration) -> Self {
        Self {
            ceiling,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one request for `operation` at the current time.
    pub fn admit(&self, operation: &str) -> Admission {
        self.admit_at(operation, Utc::now())
    }

    /// Check-and-increment at an explicit instant (deterministic tests).
    pub fn admit_at(&self, operation: &str, now: DateTime<Utc>) -> Admission {
        let window_ms = (self.window.as_millis() as i64).max(1);
        let now_ms = now.timestamp_millis();
        let window_start_ms = now_ms - now_ms.rem_euclid(window_ms);

        // A poisoned counter is still just a counter; keep admitting.
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let bucket = buckets
            .entry(operation.to_string())
            .or_insert(Bucket {
                window_start_ms,
                count: 0,
            });

        if bucket.window_start_ms != window_start_ms {
            bucket.window_start_ms = window_start_ms;
            bucket.count = 0;
        }

        if bucket.count >= self.ceiling {
            let remaining_ms = (window_start_ms + window_ms - now_ms).max(0) as u64;
            return Admission {
                allowed: false,
                retry_after: Some(Duration::from_millis(remaining_ms)),
            };
        }

        bucket.count += 1;
        Admission {
            allowed: true,
            retry_after: None,
        }
    }
}
