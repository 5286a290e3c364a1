//! Replaying captured event streams
//!
//! Drives a [`SessionRecorder`] from a recorded [`InputEvent`] stream. The
//! live pause checker ticks every `pause_check_interval_ms` from session
//! start; replay computes the one tick per gap that can open a pause instead
//! of stepping through them, so replayed logs match what the live driver
//! would have produced for the same input.

use crate::aoi::{AoiClassifier, AoiLayout};
use crate::config::RecorderConfig;
use crate::error::RecorderError;
use crate::recorder::SessionRecorder;
use crate::schema::input_event::{validate_events, InputEvent};
use crate::types::{GazeSide, SessionLog};
use log::debug;

/// Parsers for captured event streams
pub struct InputEventAdapter;

impl InputEventAdapter {
    /// Parse a JSON string containing an array of events
    pub fn parse_array(json: &str) -> Result<Vec<InputEvent>, RecorderError> {
        let events: Vec<InputEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (one event per line, blank lines ignored)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<InputEvent>, RecorderError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<InputEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(RecorderError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Parse either format, deciding by the first non-whitespace character
    pub fn parse(input: &str) -> Result<Vec<InputEvent>, RecorderError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }
}

/// Offline session driver
#[derive(Debug, Clone)]
pub struct Replayer {
    config: RecorderConfig,
}

impl Replayer {
    pub fn new(config: RecorderConfig) -> Result<Self, RecorderError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Replay a validated event stream into a session log.
    ///
    /// A stream without a `stop` event is finalized at its last timestamp.
    pub fn replay(&self, events: &[InputEvent]) -> Result<SessionLog, RecorderError> {
        let problems = validate_events(events);
        if let Some(first) = problems.first() {
            return Err(RecorderError::InvalidEventStream(format!(
                "{} problem(s), first at event {} ({}): {}",
                problems.len(),
                first.index,
                first.kind,
                first.error
            )));
        }

        let mut recorder = SessionRecorder::new(self.config.clone());
        let mut layout: Option<AoiLayout> = None;
        let mut origin: Option<f64> = None;
        let mut last_time = 0.0;

        for event in events {
            let time = event.time();
            last_time = time;

            if let Some(tick) = origin.and_then(|origin| self.pause_tick(&recorder, origin, time)) {
                recorder.check_pause(tick);
            }

            match event {
                InputEvent::Start {
                    time,
                    text,
                    layout: start_layout,
                } => {
                    recorder.start_with_text(*time, text.as_deref().unwrap_or(""));
                    layout = start_layout.clone();
                    origin = Some(*time);
                }
                InputEvent::Keydown(key) => {
                    recorder.record_keystroke(key.clone());
                }
                InputEvent::Input {
                    time,
                    text,
                    selection_start,
                } => {
                    recorder.record_text_snapshot(*time, text, *selection_start);
                }
                InputEvent::Gaze { time, x, y, side } => {
                    let side = side.unwrap_or_else(|| classify(layout.as_ref(), *x, *y));
                    recorder.record_gaze_sample(*x, *y, side, *time);
                }
                InputEvent::Stop { time } => {
                    return recorder.stop(*time).ok_or_else(no_session);
                }
            }
        }

        debug!("event stream has no stop event; finalizing at {}ms", last_time);
        recorder.stop(last_time).ok_or_else(no_session)
    }

    /// The pause-checker tick that opens a pause at or before `time`, if any.
    ///
    /// Ticks fall on `origin + k * pause_check_interval_ms`. Only the first
    /// tick at least `pause_threshold_ms` after the last activity changes
    /// state, so that is the only one run.
    fn pause_tick(&self, recorder: &SessionRecorder, origin: f64, time: f64) -> Option<f64> {
        let last_activity = recorder.last_activity()?;
        let threshold = self.config.pause_threshold_ms;
        let interval = self.config.pause_check_interval_ms as f64;

        let due = last_activity + threshold;
        let k = ((due - origin) / interval).ceil().max(0.0);
        let mut tick = origin + k * interval;
        if tick < due {
            tick += interval;
        }
        // The grid collapses onto the last activity once timestamps exceed
        // f64 precision; fall back to the event time.
        if tick - last_activity < threshold {
            tick = time;
        }

        (tick <= time).then_some(tick)
    }

    /// Parse and replay in one step
    pub fn replay_str(&self, input: &str) -> Result<SessionLog, RecorderError> {
        let events = InputEventAdapter::parse(input)?;
        self.replay(&events)
    }
}

fn classify(layout: Option<&AoiLayout>, x: f64, y: f64) -> GazeSide {
    layout.map_or(GazeSide::Unknown, |layout| layout.classify(x, y))
}

fn no_session() -> RecorderError {
    RecorderError::InvalidEventStream("event stream has no start event".to_string())
}
