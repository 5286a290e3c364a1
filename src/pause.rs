//! Pause detection
//!
//! Segments an input stream into active and idle intervals. Activity is
//! event-driven (`record_activity`) while detection runs on a coarse periodic
//! tick (`check_pause`), so a pause is found even when no further input ever
//! arrives. The pause start is backdated to the last activity, which keeps the
//! logged interval independent of the tick cadence.

use crate::types::PauseInterval;
use log::debug;

/// Pause tracker state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PauseState {
    /// Not tracking (before start or after finalize)
    Quiescent,
    /// Input seen recently
    Active { last_activity: f64 },
    /// Idle since `since`
    Paused { since: f64 },
}

/// Detects idle gaps of at least `threshold_ms`
#[derive(Debug, Clone)]
pub struct PauseTracker {
    threshold_ms: f64,
    state: PauseState,
}

impl PauseTracker {
    pub fn new(threshold_ms: f64) -> Self {
        Self {
            threshold_ms,
            state: PauseState::Quiescent,
        }
    }

    pub fn threshold_ms(&self) -> f64 {
        self.threshold_ms
    }

    pub fn state(&self) -> PauseState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, PauseState::Paused { .. })
    }

    /// Time of the last activity while active; `None` when paused or quiescent.
    pub fn last_activity(&self) -> Option<f64> {
        match self.state {
            PauseState::Active { last_activity } => Some(last_activity),
            _ => None,
        }
    }

    /// Begin tracking; the session start counts as the first activity.
    pub fn start(&mut self, now: f64) {
        self.state = PauseState::Active { last_activity: now };
    }

    /// Record input activity, closing an open pause.
    ///
    /// Ignored while quiescent.
    pub fn record_activity(&mut self, timestamp: f64, cursor: Option<usize>) -> Option<PauseInterval> {
        match self.state {
            PauseState::Quiescent => None,
            PauseState::Active { .. } => {
                self.state = PauseState::Active {
                    last_activity: timestamp,
                };
                None
            }
            PauseState::Paused { since } => {
                self.state = PauseState::Active {
                    last_activity: timestamp,
                };
                debug!("pause closed after {:.0}ms", timestamp - since);
                Some(close(since, timestamp, cursor))
            }
        }
    }

    /// Periodic tick. Returns true when this tick opened a pause.
    pub fn check_pause(&mut self, now: f64) -> bool {
        if let PauseState::Active { last_activity } = self.state {
            if now - last_activity >= self.threshold_ms {
                self.state = PauseState::Paused {
                    since: last_activity,
                };
                debug!("pause opened at {:.0}ms (detected at {:.0}ms)", last_activity, now);
                return true;
            }
        }
        false
    }

    /// Close any open pause at `now` and stop tracking.
    pub fn finalize(&mut self, now: f64, cursor: Option<usize>) -> Option<PauseInterval> {
        let closed = match self.state {
            PauseState::Paused { since } => Some(close(since, now, cursor)),
            _ => None,
        };
        self.state = PauseState::Quiescent;
        closed
    }
}

fn close(start_time: f64, end_time: f64, cursor: Option<usize>) -> PauseInterval {
    PauseInterval {
        start_time,
        end_time,
        duration: end_time - start_time,
        cursor_index_at_pause: cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pause_backdated_to_last_activity() {
        let mut tracker = PauseTracker::new(2000.0);
        tracker.start(0.0);
        assert!(tracker.record_activity(0.0, Some(0)).is_none());

        assert!(!tracker.check_pause(1999.0));
        assert!(tracker.check_pause(2000.0));
        assert_eq!(tracker.state(), PauseState::Paused { since: 0.0 });

        let pause = tracker.record_activity(2500.0, Some(4)).unwrap();
        assert_eq!(
            pause,
            PauseInterval {
                start_time: 0.0,
                end_time: 2500.0,
                duration: 2500.0,
                cursor_index_at_pause: Some(4),
            }
        );
        assert_eq!(tracker.state(), PauseState::Active { last_activity: 2500.0 });
        assert_eq!(tracker.last_activity(), Some(2500.0));
    }

    #[test]
    fn test_last_activity_only_while_active() {
        let mut tracker = PauseTracker::new(1000.0);
        assert_eq!(tracker.last_activity(), None);
        tracker.start(5.0);
        assert_eq!(tracker.last_activity(), Some(5.0));
        tracker.check_pause(1005.0);
        assert_eq!(tracker.last_activity(), None);
    }

    #[test]
    fn test_tick_latency_does_not_shift_start() {
        let mut tracker = PauseTracker::new(2000.0);
        tracker.start(0.0);
        tracker.record_activity(300.0, None);

        // Tick arrives late
        assert!(tracker.check_pause(2450.0));
        let pause = tracker.record_activity(3000.0, None).unwrap();
        assert_eq!(pause.start_time, 300.0);
        assert_eq!(pause.duration, 2700.0);
    }

    #[test]
    fn test_repeated_ticks_open_once() {
        let mut tracker = PauseTracker::new(1000.0);
        tracker.start(0.0);
        assert!(tracker.check_pause(1000.0));
        assert!(!tracker.check_pause(1100.0));
        assert!(!tracker.check_pause(5000.0));
        assert_eq!(tracker.state(), PauseState::Paused { since: 0.0 });
    }

    #[test]
    fn test_activity_resets_gap() {
        let mut tracker = PauseTracker::new(2000.0);
        tracker.start(0.0);
        tracker.record_activity(1500.0, None);
        assert!(!tracker.check_pause(2000.0));
        assert!(!tracker.check_pause(3400.0));
        assert!(tracker.check_pause(3500.0));
    }

    #[test]
    fn test_session_start_counts_as_activity() {
        let mut tracker = PauseTracker::new(2000.0);
        tracker.start(100.0);
        assert!(tracker.check_pause(2100.0));
        let pause = tracker.finalize(2600.0, None).unwrap();
        assert_eq!(pause.start_time, 100.0);
        assert_eq!(pause.end_time, 2600.0);
        assert_eq!(pause.duration, 2500.0);
    }

    #[test]
    fn test_finalize_while_active_emits_nothing() {
        let mut tracker = PauseTracker::new(2000.0);
        tracker.start(0.0);
        tracker.record_activity(500.0, None);
        assert!(tracker.finalize(1000.0, None).is_none());
        assert_eq!(tracker.state(), PauseState::Quiescent);
    }

    #[test]
    fn test_quiescent_ignores_input() {
        let mut tracker = PauseTracker::new(2000.0);
        assert!(tracker.record_activity(10.0, None).is_none());
        assert!(!tracker.check_pause(50_000.0));
        assert_eq!(tracker.state(), PauseState::Quiescent);

        tracker.start(0.0);
        tracker.check_pause(3000.0);
        tracker.finalize(3500.0, None);
        assert!(tracker.record_activity(4000.0, None).is_none());
        assert!(tracker.finalize(5000.0, None).is_none());
    }

    #[test]
    fn test_duration_is_end_minus_start() {
        let mut tracker = PauseTracker::new(2000.0);
        tracker.start(0.0);
        tracker.check_pause(2000.0);
        let pause = tracker.record_activity(2000.0, None).unwrap();
        assert_eq!(pause.duration, pause.end_time - pause.start_time);
    }
}
