//! Recorded input event stream
//!
//! A session can be captured as a flat stream of timestamped input events and
//! replayed later through a [`crate::SessionRecorder`]. One event per line
//! (NDJSON), tagged by `kind`:
//!
//! ```json
//! {"kind":"start","time":0,"layout":{"viewportWidth":1280}}
//! {"kind":"keydown","time":120,"key":"h","code":"KeyH","selectionStart":0,"selectionEnd":0,"textLen":0}
//! {"kind":"input","time":121,"text":"h","selectionStart":1}
//! {"kind":"gaze","time":150,"x":900,"y":300}
//! {"kind":"stop","time":5000}
//! ```

use crate::aoi::AoiLayout;
use crate::types::{GazeSide, KeyEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One captured input event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    /// Session start, with the optional initial text and screen layout
    Start {
        time: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layout: Option<AoiLayout>,
    },
    Keydown(KeyEvent),
    /// Text snapshot taken after an input notification
    Input {
        time: f64,
        text: String,
        #[serde(
            rename = "selectionStart",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        selection_start: Option<usize>,
    },
    /// Gaze prediction; `side` is classified from the start layout when absent
    Gaze {
        time: f64,
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        side: Option<GazeSide>,
    },
    Stop {
        time: f64,
    },
}

impl InputEvent {
    pub fn time(&self) -> f64 {
        match self {
            InputEvent::Start { time, .. }
            | InputEvent::Input { time, .. }
            | InputEvent::Gaze { time, .. }
            | InputEvent::Stop { time } => *time,
            InputEvent::Keydown(event) => event.time,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::Start { .. } => "start",
            InputEvent::Keydown(_) => "keydown",
            InputEvent::Input { .. } => "input",
            InputEvent::Gaze { .. } => "gaze",
            InputEvent::Stop { .. } => "stop",
        }
    }
}

/// Problems found in an event stream
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{kind} event before session start")]
    BeforeStart { kind: String },

    #[error("duplicate start event")]
    DuplicateStart,

    #[error("{kind} event after session stop")]
    AfterStop { kind: String },

    #[error("timestamp {current} is earlier than previous timestamp {previous}")]
    TimeWentBackwards { previous: f64, current: f64 },

    #[error("timestamp is not a finite number")]
    NonFiniteTime,
}

/// A validation failure at a given position in the stream
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub kind: &'static str,
    pub error: ValidationError,
}

/// Check an event stream for ordering problems.
///
/// Returns one entry per offending event; an empty vector means the stream
/// can be replayed.
pub fn validate_events(events: &[InputEvent]) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    let mut started = false;
    let mut stopped = false;
    let mut previous_time: Option<f64> = None;

    for (index, event) in events.iter().enumerate() {
        let kind = event.kind();
        let time = event.time();
        let mut fail = |error| {
            results.push(ValidationResult { index, kind, error });
        };

        if !time.is_finite() {
            fail(ValidationError::NonFiniteTime);
        } else {
            if let Some(previous) = previous_time.filter(|p| time < *p) {
                fail(ValidationError::TimeWentBackwards {
                    previous,
                    current: time,
                });
            }
            previous_time = Some(time);
        }

        match event {
            InputEvent::Start { .. } if started => fail(ValidationError::DuplicateStart),
            InputEvent::Start { .. } => started = true,
            _ if !started => fail(ValidationError::BeforeStart {
                kind: kind.to_string(),
            }),
            _ if stopped => fail(ValidationError::AfterStop {
                kind: kind.to_string(),
            }),
            InputEvent::Stop { .. } => stopped = true,
            _ => {}
        }
    }

    results
}
