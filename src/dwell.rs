//! Dwell segmentation
//!
//! Consolidates a noisy stream of categorical attention samples into
//! contiguous segments. A segment closes when the category changes; it is kept
//! only if it lasted at least `min_dwell_ms`. Short segments are dropped, not
//! merged into their neighbours.

use crate::types::DwellSegment;

#[derive(Debug, Clone, PartialEq)]
struct OpenSegment<C> {
    category: C,
    start: f64,
}

/// Stateful dwell segmenter over categories of type `C`
#[derive(Debug, Clone)]
pub struct DwellSegmenter<C> {
    min_dwell_ms: f64,
    open: Option<OpenSegment<C>>,
}

impl<C: Clone + PartialEq> DwellSegmenter<C> {
    pub fn new(min_dwell_ms: f64) -> Self {
        Self {
            min_dwell_ms,
            open: None,
        }
    }

    pub fn min_dwell_ms(&self) -> f64 {
        self.min_dwell_ms
    }

    /// Category of the currently open segment, if any
    pub fn current(&self) -> Option<&C> {
        self.open.as_ref().map(|segment| &segment.category)
    }

    /// Feed one sample. `None` means the sample could not be categorized,
    /// which ends the open segment without starting a new one.
    pub fn observe(&mut self, category: Option<C>, timestamp: f64) -> Option<DwellSegment<C>> {
        if self.current() == category.as_ref() {
            return None;
        }

        let closed = self.open.take().and_then(|open| self.close(open, timestamp));
        self.open = category.map(|category| OpenSegment {
            category,
            start: timestamp,
        });
        closed
    }

    /// Close the open segment at `now` and reset.
    pub fn finalize(&mut self, now: f64) -> Option<DwellSegment<C>> {
        self.open.take().and_then(|open| self.close(open, now))
    }

    pub fn reset(&mut self) {
        self.open = None;
    }

    fn close(&self, open: OpenSegment<C>, end_time: f64) -> Option<DwellSegment<C>> {
        let duration = end_time - open.start;
        (duration >= self.min_dwell_ms).then(|| DwellSegment {
            category: open.category,
            start_time: open.start,
            end_time,
            duration,
        })
    }
}
