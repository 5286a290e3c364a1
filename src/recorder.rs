//! Session recorder
//!
//! Owns the pause tracker and dwell segmenter for one session, routes raw
//! events to them, and accumulates the structured records. `stop` finalizes
//! the open segments and hands back the complete [`SessionLog`].
//!
//! The recorder is a plain state machine: every entry point takes an explicit
//! timestamp, and none of them fail. Calls outside an active session are
//! no-ops reported through the return value.

use crate::config::RecorderConfig;
use crate::diff::diff;
use crate::dwell::DwellSegmenter;
use crate::pause::PauseTracker;
use crate::types::{
    DwellSegment, GazeSample, GazeSide, KeyEvent, PauseInterval, RecorderStatus, SessionLog,
    SessionMeta, TextChange, PAYLOAD_VERSION,
};
use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

/// Per-session accumulators, created at start and swapped out at stop
#[derive(Debug)]
struct ActiveSession {
    id: String,
    started_at: f64,
    started_at_utc: DateTime<Utc>,
    previous_text: String,
    last_cursor: Option<usize>,
    keystrokes: Vec<KeyEvent>,
    text_changes: Vec<TextChange>,
    pauses: Vec<PauseInterval>,
    gaze_raw: Vec<GazeSample>,
    gaze_states: Vec<DwellSegment>,
}

/// Orchestrates diff classification, pause tracking and dwell segmentation
#[derive(Debug)]
pub struct SessionRecorder {
    config: RecorderConfig,
    pause: PauseTracker,
    dwell: DwellSegmenter<GazeSide>,
    session: Option<ActiveSession>,
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new(RecorderConfig::default())
    }
}

impl SessionRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            pause: PauseTracker::new(config.pause_threshold_ms),
            dwell: DwellSegmenter::new(config.min_dwell_ms),
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    /// Start a session with an empty text baseline.
    ///
    /// Returns false (and leaves the running session untouched) if a session
    /// is already active.
    pub fn start(&mut self, now: f64) -> bool {
        self.start_with_text(now, "")
    }

    /// Start a session whose first diff is taken against `initial_text`.
    pub fn start_with_text(&mut self, now: f64, initial_text: &str) -> bool {
        if let Some(session) = &self.session {
            debug!("start ignored: session {} already active", session.id);
            return false;
        }

        let session = ActiveSession {
            id: Uuid::new_v4().to_string(),
            started_at: now,
            started_at_utc: Utc::now(),
            previous_text: initial_text.to_string(),
            last_cursor: None,
            keystrokes: Vec::new(),
            text_changes: Vec::new(),
            pauses: Vec::new(),
            gaze_raw: Vec::new(),
            gaze_states: Vec::new(),
        };

        self.pause.start(now);
        self.dwell.reset();
        info!("recording session {} started at {:.1}ms", session.id, now);
        self.session = Some(session);
        true
    }

    /// Append a key press. Returns false when no session is active.
    pub fn record_keystroke(&mut self, event: KeyEvent) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.last_cursor = Some(event.selection_start);
        session.keystrokes.push(event);
        true
    }

    /// Diff `text` against the last-seen text and record the change.
    ///
    /// Every snapshot counts as input activity, even when the text is
    /// unchanged, so it always closes an open pause.
    pub fn record_text_snapshot(
        &mut self,
        now: f64,
        text: &str,
        selection_start: Option<usize>,
    ) -> Option<&TextChange> {
        let session = self.session.as_mut()?;

        let change = diff(&session.previous_text, text).map(|op| TextChange {
            time: now,
            op,
            cursor_after: selection_start,
        });
        let changed = change.is_some();
        session.text_changes.extend(change);

        if let Some(pause) = self.pause.record_activity(now, selection_start) {
            session.pauses.push(pause);
        }

        session.previous_text = text.to_string();
        if selection_start.is_some() {
            session.last_cursor = selection_start;
        }

        if changed {
            session.text_changes.last()
        } else {
            None
        }
    }

    /// Append a raw gaze sample and feed its side to the dwell segmenter.
    pub fn record_gaze_sample(&mut self, x: f64, y: f64, side: GazeSide, timestamp: f64) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        session.gaze_raw.push(GazeSample {
            time: timestamp,
            x,
            y,
            side,
        });
        if let Some(segment) = self.dwell.observe(side.as_category(), timestamp) {
            session.gaze_states.push(segment);
        }
        true
    }

    /// Pause checker tick. Returns true when this tick opened a pause.
    pub fn check_pause(&mut self, now: f64) -> bool {
        if self.session.is_none() {
            return false;
        }
        self.pause.check_pause(now)
    }

    pub fn is_paused(&self) -> bool {
        self.session.is_some() && self.pause.is_paused()
    }

    /// Last input activity of the active session, unless a pause is open.
    ///
    /// A pause opens at the first tick at least `pause_threshold_ms` after it.
    pub fn last_activity(&self) -> Option<f64> {
        self.session.as_ref().and(self.pause.last_activity())
    }

    /// End the session and return its log.
    ///
    /// Returns `None` when no session is active, so a repeated call is a no-op.
    pub fn stop(&mut self, now: f64) -> Option<SessionLog> {
        let Some(mut session) = self.session.take() else {
            debug!("stop ignored: no active session");
            return None;
        };

        session
            .pauses
            .extend(self.pause.finalize(now, session.last_cursor));
        session.gaze_states.extend(self.dwell.finalize(now));

        let log = SessionLog {
            meta: SessionMeta {
                version: PAYLOAD_VERSION.to_string(),
                started_at: session.started_at,
                ended_at: now,
                pause_threshold_ms: self.config.pause_threshold_ms,
                gaze_sample_every_ms: self.config.gaze_sample_interval_ms,
                min_dwell_ms: self.config.min_dwell_ms,
            },
            keystrokes: session.keystrokes,
            text_changes: session.text_changes,
            pauses: session.pauses,
            gaze_raw: session.gaze_raw,
            gaze_states: session.gaze_states,
        };

        info!(
            "recording session {} stopped after {:.0}ms: {} keystrokes, {} text changes, {} pauses, {} gaze samples, {} dwell segments",
            session.id,
            log.duration_ms(),
            log.keystrokes.len(),
            log.text_changes.len(),
            log.pauses.len(),
            log.gaze_raw.len(),
            log.gaze_states.len()
        );

        Some(log)
    }

    pub fn status(&self) -> RecorderStatus {
        match &self.session {
            Some(session) => RecorderStatus {
                active: true,
                session_id: Some(session.id.clone()),
                started_at_utc: Some(session.started_at_utc),
                paused: self.pause.is_paused(),
                keystrokes: session.keystrokes.len(),
                text_changes: session.text_changes.len(),
                pauses: session.pauses.len(),
                gaze_samples: session.gaze_raw.len(),
                dwell_segments: session.gaze_states.len(),
            },
            None => RecorderStatus {
                active: false,
                session_id: None,
                started_at_utc: None,
                paused: false,
                keystrokes: 0,
                text_changes: 0,
                pauses: 0,
                gaze_samples: 0,
                dwell_segments: 0,
            },
        }
    }
}
