//! Bookable slot generation over a provider's working window.

use chrono::{Duration, NaiveDate, NaiveTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

use super::overlap::{overlaps_any, TimeWindow};

/// A candidate fixed-duration interval within a working window, tagged with
/// its availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Slot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub available: bool,
}

/// Generate the ordered sequence of bookable slots for one day.
///
/// Starting at `window_start`, steps by `duration_minutes`; a final partial
/// step that would run past `window_end` is dropped. Each slot is marked
/// available unless it overlaps one of the `busy` windows.
///
/// Fails validation (with no partial result) when the window is empty or the
/// duration is not positive.
pub fn generate_slots(
    date: NaiveDate,
    window_start: NaiveTime,
    window_end: NaiveTime,
    duration_minutes: u32,
    busy: &[TimeWindow],
) -> Result<Vec<Slot>> {
    if duration_minutes == 0 {
        return Err(ValidationError::NonPositiveDuration(0).into());
    }
    if window_end <= window_start {
        return Err(ValidationError::EmptyWindow {
            start: window_start,
            end: window_end,
        }
        .into());
    }

    let step = Duration::minutes(i64::from(duration_minutes));
    let day_end = date.and_time(window_end);

    let mut slots = Vec::new();
    let mut cursor = date.and_time(window_start);
    loop {
        let slot_end = cursor + step;
        if slot_end > day_end {
            break;
        }
        let candidate = TimeWindow::new(cursor, slot_end);
        slots.push(Slot {
            start: cursor.time(),
            end: slot_end.time(),
            available: !overlaps_any(&candidate, busy),
        });
        cursor = slot_end;
    }

    Ok(slots)
}
