//! Half-open time interval intersection.

use chrono::{Duration, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Create a window from explicit bounds.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Create a window starting at `start` and lasting `duration_minutes`.
    pub fn starting_at(start: NaiveDateTime, duration_minutes: u32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    /// A window whose end does not lie after its start covers no time at all.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Length of the window in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether this window intersects another. Empty windows overlap
    /// nothing.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        overlaps(self.start, self.end, other.start, other.end)
    }
}

/// Two half-open intervals `[a_start, a_end)` and `[b_start, b_end)`
/// intersect iff each one starts before the other ends.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Whether a candidate window intersects any of the given busy windows.
pub fn overlaps_any(candidate: &TimeWindow, busy: &[TimeWindow]) -> bool {
    busy.iter().any(|window| candidate.overlaps(window))
}
