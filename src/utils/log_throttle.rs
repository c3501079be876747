//! Per-key log suppression: at most one event per key per interval, with a
//! count of what was swallowed in between.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug)]
struct Window {
    started_at: Instant,
    suppressed: u64,
}

#[derive(Debug)]
pub struct LogThrottle {
    interval: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// `Some(suppressed_since_last)` when an event for `key` may be logged now.
    pub fn should_emit(&self, key: &str) -> Option<u64> {
        self.should_emit_at(key, Instant::now())
    }

    fn should_emit_at(&self, key: &str, now: Instant) -> Option<u64> {
        let mut windows = self.windows.lock();
        let Some(window) = windows.get_mut(key) else {
            windows.insert(
                key.to_owned(),
                Window {
                    started_at: now,
                    suppressed: 0,
                },
            );
            return Some(0);
        };

        if now.duration_since(window.started_at) < self.interval {
            window.suppressed += 1;
            return None;
        }
        let suppressed = std::mem::take(&mut window.suppressed);
        window.started_at = now;
        Some(suppressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_then_suppresses_then_reports_count() {
        let throttle = LogThrottle::new(Duration::from_secs(30));
        let start = Instant::now();

        assert_eq!(throttle.should_emit_at("client", start), Some(0));
        assert_eq!(throttle.should_emit_at("client", start + Duration::from_secs(1)), None);
        assert_eq!(throttle.should_emit_at("client", start + Duration::from_secs(2)), None);
        assert_eq!(
            throttle.should_emit_at("client", start + Duration::from_secs(31)),
            Some(2)
        );
        assert_eq!(throttle.should_emit_at("client", start + Duration::from_secs(32)), None);
    }

    #[test]
    fn keys_are_independent() {
        let throttle = LogThrottle::new(Duration::from_secs(60));
        assert_eq!(throttle.should_emit("a"), Some(0));
        assert_eq!(throttle.should_emit("b"), Some(0));
        assert_eq!(throttle.should_emit("a"), None);
    }
}
