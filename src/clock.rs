//! Session clocks
//!
//! All timestamps in a session log are milliseconds relative to one origin.
//! Collaborators that stamp their own samples must read the same clock.

use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Monotonic millisecond time source
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Wall-independent clock anchored at construction time.
///
/// Backed by `tokio::time::Instant`, so paused test runtimes drive it
/// deterministically.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        if let Ok(mut now) = self.now.lock() {
            *now = ms;
        }
    }

    pub fn advance(&self, ms: f64) {
        if let Ok(mut now) = self.now.lock() {
            *now += ms;
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10.0);
        assert_eq!(clock.now_ms(), 10.0);
        clock.advance(5.5);
        assert_eq!(clock.now_ms(), 15.5);
        clock.set(100.0);
        assert_eq!(clock.clone().now_ms(), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_clock_follows_runtime_time() {
        let clock = MonotonicClock::new();
        assert_eq!(clock.now_ms(), 0.0);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!((clock.now_ms() - 250.0).abs() < 1e-6);
    }
}
