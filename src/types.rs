//! Event record types
//!
//! This module defines the records that flow out of the recorder and the
//! exported session payload. Serialized field names follow the `etl-1.0`
//! payload layout consumed by downstream analysis, so renames here are
//! breaking changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload version embedded in every exported session log
pub const PAYLOAD_VERSION: &str = "etl-1.0";

/// Area-of-interest category for a gaze sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazeSide {
    /// Graph / stimulus region (left half of the screen by default)
    Left,
    /// Writing region (right half of the screen by default)
    Right,
    /// Coordinate could not be classified
    Unknown,
}

impl GazeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            GazeSide::Left => "left",
            GazeSide::Right => "right",
            GazeSide::Unknown => "unknown",
        }
    }

    /// Dwell category for this side; `Unknown` means "no open segment".
    pub fn as_category(self) -> Option<GazeSide> {
        match self {
            GazeSide::Unknown => None,
            side => Some(side),
        }
    }
}

impl std::str::FromStr for GazeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(GazeSide::Left),
            "right" => Ok(GazeSide::Right),
            "unknown" => Ok(GazeSide::Unknown),
            other => Err(format!("unknown gaze side '{}'", other)),
        }
    }
}

/// Single-region text edit produced by [`crate::diff::diff`].
///
/// `start` and `end` are char offsets into the old text; `end` marks the end of
/// the replaced old region, so inserts have `start == end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditOp {
    Insert {
        start: usize,
        end: usize,
        #[serde(rename = "nChars")]
        n_chars: usize,
        text: String,
    },
    Delete {
        start: usize,
        end: usize,
        #[serde(rename = "nChars")]
        n_chars: usize,
        text: String,
    },
    Replace {
        start: usize,
        end: usize,
        #[serde(rename = "nCharsDel")]
        n_chars_del: usize,
        #[serde(rename = "nCharsIns")]
        n_chars_ins: usize,
        #[serde(rename = "delText")]
        del_text: String,
        #[serde(rename = "insText")]
        ins_text: String,
    },
}

impl EditOp {
    pub fn start(&self) -> usize {
        match self {
            EditOp::Insert { start, .. }
            | EditOp::Delete { start, .. }
            | EditOp::Replace { start, .. } => *start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            EditOp::Insert { end, .. } | EditOp::Delete { end, .. } | EditOp::Replace { end, .. } => {
                *end
            }
        }
    }

    pub fn inserted_text(&self) -> Option<&str> {
        match self {
            EditOp::Insert { text, .. } => Some(text),
            EditOp::Replace { ins_text, .. } => Some(ins_text),
            EditOp::Delete { .. } => None,
        }
    }

    pub fn deleted_text(&self) -> Option<&str> {
        match self {
            EditOp::Delete { text, .. } => Some(text),
            EditOp::Replace { del_text, .. } => Some(del_text),
            EditOp::Insert { .. } => None,
        }
    }

    /// Apply this edit to the text it was computed from.
    pub fn apply(&self, old_text: &str) -> String {
        let start = self.start();
        let end = self.end();
        let mut out: String = old_text.chars().take(start).collect();
        if let Some(inserted) = self.inserted_text() {
            out.push_str(inserted);
        }
        out.extend(old_text.chars().skip(end));
        out
    }
}

/// One physical key press
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    /// Session-relative timestamp in milliseconds
    pub time: f64,
    /// Logical key value (e.g. "a", "Backspace")
    pub key: String,
    /// Physical key code (e.g. "KeyA")
    pub code: String,
    pub selection_start: usize,
    pub selection_end: usize,
    /// Length of the text at the time of the key press
    #[serde(rename = "textLen")]
    pub text_length: usize,
}

/// A classified text mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChange {
    /// Session-relative timestamp in milliseconds
    pub time: f64,
    #[serde(flatten)]
    pub op: EditOp,
    /// Selection start after the mutation
    pub cursor_after: Option<usize>,
}

/// A closed interval without input activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseInterval {
    pub start_time: f64,
    pub end_time: f64,
    /// `end_time - start_time`
    pub duration: f64,
    pub cursor_index_at_pause: Option<usize>,
}

/// Raw gaze sample, recorded for every sensor poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub side: GazeSide,
}

/// Consolidated dwell segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DwellSegment<C = GazeSide> {
    #[serde(rename = "side")]
    pub category: C,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
}

fn default_min_dwell_ms() -> f64 {
    crate::config::DEFAULT_MIN_DWELL_MS
}

/// Session metadata and configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub version: String,
    pub started_at: f64,
    pub ended_at: f64,
    pub pause_threshold_ms: f64,
    #[serde(alias = "gazeSampleIntervalMs")]
    pub gaze_sample_every_ms: u64,
    #[serde(default = "default_min_dwell_ms")]
    pub min_dwell_ms: f64,
}

/// Complete log of one recording session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub meta: SessionMeta,
    pub keystrokes: Vec<KeyEvent>,
    #[serde(rename = "textchanges")]
    pub text_changes: Vec<TextChange>,
    pub pauses: Vec<PauseInterval>,
    pub gaze_raw: Vec<GazeSample>,
    pub gaze_states: Vec<DwellSegment>,
}

impl SessionLog {
    /// Session length in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.meta.ended_at - self.meta.started_at
    }

    /// Total number of records across all sequences
    pub fn record_count(&self) -> usize {
        self.keystrokes.len()
            + self.text_changes.len()
            + self.pauses.len()
            + self.gaze_raw.len()
            + self.gaze_states.len()
    }
}

/// Point-in-time view of a recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatus {
    pub active: bool,
    pub session_id: Option<String>,
    pub started_at_utc: Option<DateTime<Utc>>,
    pub paused: bool,
    pub keystrokes: usize,
    pub text_changes: usize,
    pub pauses: usize,
    pub gaze_samples: usize,
    pub dwell_segments: usize,
}
