//! Recorder configuration

use crate::error::RecorderError;
use serde::{Deserialize, Serialize};

/// Minimum idle gap (ms) counted as a pause
pub const DEFAULT_PAUSE_THRESHOLD_MS: f64 = 2000.0;

/// Gaze sensor poll cadence (ms)
pub const DEFAULT_GAZE_SAMPLE_INTERVAL_MS: u64 = 100;

/// Minimum dwell segment duration (ms) to retain
pub const DEFAULT_MIN_DWELL_MS: f64 = 120.0;

/// Pause checker tick cadence (ms)
pub const DEFAULT_PAUSE_CHECK_INTERVAL_MS: u64 = 100;

/// Upper bound on a single gaze prediction request (ms)
pub const DEFAULT_GAZE_TIMEOUT_MS: u64 = 1000;

/// Tunable thresholds and cadences for a recording session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Idle gap that opens a pause
    pub pause_threshold_ms: f64,
    /// Gaze sensor poll interval
    pub gaze_sample_interval_ms: u64,
    /// Dwell segments shorter than this are dropped
    pub min_dwell_ms: f64,
    /// How often the pause checker runs
    pub pause_check_interval_ms: u64,
    /// Gaze requests slower than this are skipped
    pub gaze_timeout_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            pause_threshold_ms: DEFAULT_PAUSE_THRESHOLD_MS,
            gaze_sample_interval_ms: DEFAULT_GAZE_SAMPLE_INTERVAL_MS,
            min_dwell_ms: DEFAULT_MIN_DWELL_MS,
            pause_check_interval_ms: DEFAULT_PAUSE_CHECK_INTERVAL_MS,
            gaze_timeout_ms: DEFAULT_GAZE_TIMEOUT_MS,
        }
    }
}

impl RecorderConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, RecorderError> {
        let config: RecorderConfig = serde_json::from_str(json)
            .map_err(|e| RecorderError::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_pause_threshold_ms(mut self, ms: f64) -> Self {
        self.pause_threshold_ms = ms;
        self
    }

    pub fn with_gaze_sample_interval_ms(mut self, ms: u64) -> Self {
        self.gaze_sample_interval_ms = ms;
        self
    }

    pub fn with_min_dwell_ms(mut self, ms: f64) -> Self {
        self.min_dwell_ms = ms;
        self
    }

    pub fn with_pause_check_interval_ms(mut self, ms: u64) -> Self {
        self.pause_check_interval_ms = ms;
        self
    }

    /// Check that every threshold is usable.
    ///
    /// Intervals must be non-zero because they drive repeating timers.
    pub fn validate(&self) -> Result<(), RecorderError> {
        if !self.pause_threshold_ms.is_finite() || self.pause_threshold_ms <= 0.0 {
            return Err(RecorderError::InvalidConfig(format!(
                "pauseThresholdMs must be a positive number, got {}",
                self.pause_threshold_ms
            )));
        }
        if !self.min_dwell_ms.is_finite() || self.min_dwell_ms < 0.0 {
            return Err(RecorderError::InvalidConfig(format!(
                "minDwellMs must be a non-negative number, got {}",
                self.min_dwell_ms
            )));
        }
        if self.gaze_sample_interval_ms == 0 {
            return Err(RecorderError::InvalidConfig(
                "gazeSampleIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.pause_check_interval_ms == 0 {
            return Err(RecorderError::InvalidConfig(
                "pauseCheckIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.gaze_timeout_ms == 0 {
            return Err(RecorderError::InvalidConfig(
                "gazeTimeoutMs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
