//! Session log encoding
//!
//! Serializes a [`SessionLog`] into the `etl-1.0` JSON payload. Before encoding,
//! the log is checked for the structural guarantees downstream analysis relies
//! on: ordered, non-overlapping intervals whose durations match their bounds.

use crate::error::RecorderError;
use crate::types::{SessionLog, PAYLOAD_VERSION};

const EPSILON: f64 = 1e-6;

/// Encoder for exported session payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionLogEncoder {
    pretty: bool,
}

impl SessionLogEncoder {
    /// Compact single-line output
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Check the log's structural guarantees
    pub fn check(&self, log: &SessionLog) -> Result<(), RecorderError> {
        let meta = &log.meta;
        if meta.version != PAYLOAD_VERSION {
            return Err(RecorderError::EncodingError(format!(
                "unsupported payload version '{}'",
                meta.version
            )));
        }
        if meta.ended_at < meta.started_at {
            return Err(RecorderError::EncodingError(format!(
                "session ends before it starts ({} < {})",
                meta.ended_at, meta.started_at
            )));
        }

        check_intervals(
            "pause",
            log.pauses
                .iter()
                .map(|p| (p.start_time, p.end_time, p.duration)),
        )?;
        check_intervals(
            "dwell segment",
            log.gaze_states
                .iter()
                .map(|s| (s.start_time, s.end_time, s.duration)),
        )?;

        if let Some(short) = log
            .gaze_states
            .iter()
            .find(|s| s.duration + EPSILON < meta.min_dwell_ms)
        {
            return Err(RecorderError::EncodingError(format!(
                "dwell segment at {} is shorter than {}ms",
                short.start_time, meta.min_dwell_ms
            )));
        }

        Ok(())
    }

    /// Check and serialize the log
    pub fn encode_to_json(&self, log: &SessionLog) -> Result<String, RecorderError> {
        self.check(log)?;
        let json = if self.pretty {
            serde_json::to_string_pretty(log)
        } else {
            serde_json::to_string(log)
        };
        json.map_err(|e| RecorderError::EncodingError(e.to_string()))
    }

    /// Parse a previously exported payload
    pub fn decode(json: &str) -> Result<SessionLog, RecorderError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn check_intervals(
    label: &str,
    intervals: impl Iterator<Item = (f64, f64, f64)>,
) -> Result<(), RecorderError> {
    let mut previous_end = f64::NEG_INFINITY;

    for (start, end, duration) in intervals {
        if end < start {
            return Err(RecorderError::EncodingError(format!(
                "{label} ends before it starts ({end} < {start})"
            )));
        }
        if (duration - (end - start)).abs() > EPSILON {
            return Err(RecorderError::EncodingError(format!(
                "{label} at {start} has duration {duration}, expected {}",
                end - start
            )));
        }
        if start + EPSILON < previous_end {
            return Err(RecorderError::EncodingError(format!(
                "{label} at {start} overlaps the previous one"
            )));
        }
        previous_end = end;
    }

    Ok(())
}
