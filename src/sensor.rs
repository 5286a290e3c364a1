//! Gaze sensor interface
//!
//! The gaze prediction model is an opaque collaborator: the recorder only asks
//! it for the current coordinate estimate once per poll.

use crate::error::RecorderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Estimated gaze position in client coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
}

impl GazePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Source of gaze predictions
#[async_trait]
pub trait GazeSensor: Send + Sync {
    /// Current prediction, or `None` when the sensor has no estimate yet.
    ///
    /// Errors are treated as transient: the poll is skipped and the next one
    /// tries again.
    async fn current_prediction(&self) -> Result<Option<GazePoint>, RecorderError>;
}
