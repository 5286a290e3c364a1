//! Area-of-interest classification
//!
//! Maps a gaze coordinate to a [`GazeSide`]. The default layout hit-tests the
//! graph and writer element rectangles and falls back to the viewport midline.

use crate::types::GazeSide;
use serde::{Deserialize, Serialize};

/// Maps a screen coordinate to an area of interest
pub trait AoiClassifier: Send + Sync {
    fn classify(&self, x: f64, y: f64) -> GazeSide;
}

/// Axis-aligned rectangle in client coordinates (edges inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// Graph / writer layout with a midline fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AoiLayout {
    /// Stimulus region, classified as `left`
    #[serde(default)]
    pub graph: Option<Rect>,
    /// Writing region, classified as `right`
    #[serde(default)]
    pub writer: Option<Rect>,
    pub viewport_width: f64,
}

impl AoiLayout {
    /// Layout with no element rectangles; only the midline split applies.
    pub fn midline(viewport_width: f64) -> Self {
        Self {
            graph: None,
            writer: None,
            viewport_width,
        }
    }

    pub fn with_graph(mut self, rect: Rect) -> Self {
        self.graph = Some(rect);
        self
    }

    pub fn with_writer(mut self, rect: Rect) -> Self {
        self.writer = Some(rect);
        self
    }
}

impl AoiClassifier for AoiLayout {
    fn classify(&self, x: f64, y: f64) -> GazeSide {
        if self.graph.is_some_and(|rect| rect.contains(x, y)) {
            return GazeSide::Left;
        }
        if self.writer.is_some_and(|rect| rect.contains(x, y)) {
            return GazeSide::Right;
        }

        let mid = self.viewport_width / 2.0;
        if x < mid {
            GazeSide::Left
        } else if x >= mid {
            GazeSide::Right
        } else {
            // NaN coordinates or viewport width
            GazeSide::Unknown
        }
    }
}
