//! Booking conflict guard.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::appointment::AppointmentId;
use crate::directory::AppointmentTypeDirectory;
use crate::error::{Result, ValidationError};
use crate::store::AppointmentStore;

use super::overlap::{overlaps_any, TimeWindow};

/// Decides whether a candidate booking overlaps an *active* appointment of
/// the same provider.
///
/// Active means slot-holding (`planned` or `in_progress`): pending requests
/// and terminal appointments do not block a slot. When editing, the
/// appointment's own id is excluded so a no-op edit cannot self-conflict.
pub struct ConflictGuard {
    store: Arc<dyn AppointmentStore>,
    types: Arc<dyn AppointmentTypeDirectory>,
    default_duration_minutes: u32,
}

impl ConflictGuard {
    /// Create a guard over the given store and type directory.
    pub fn new(store: Arc<dyn AppointmentStore>, types: Arc<dyn AppointmentTypeDirectory>) -> Self {
        Self {
            store,
            types,
            default_duration_minutes: crate::appointment::DEFAULT_DURATION_MINUTES,
        }
    }

    /// Override the fallback duration used when a type's duration is absent
    /// or unparsable.
    pub fn with_default_duration(mut self, minutes: u32) -> Self {
        self.default_duration_minutes = minutes;
        self
    }

    /// Resolve an appointment type's duration in minutes, falling back to
    /// the configured default for unknown types or unparsable values.
    pub async fn resolve_duration(&self, type_id: i64) -> Result<u32> {
        match self.types.appointment_type(type_id).await? {
            Some(kind) => Ok(crate::appointment::parse_duration_minutes(
                kind.duration.as_deref(),
                self.default_duration_minutes,
            )),
            None => Ok(self.default_duration_minutes),
        }
    }

    /// The provider's slot-holding windows for `date`, minus the excluded
    /// appointment.
    pub async fn active_windows(
        &self,
        provider_id: i64,
        date: NaiveDate,
        exclude: Option<AppointmentId>,
    ) -> Result<Vec<TimeWindow>> {
        let appointments = self.store.list_for_provider_on(provider_id, date).await?;

        let mut windows = Vec::new();
        for appointment in appointments {
            if Some(appointment.id) == exclude {
                continue;
            }
            if !appointment.state.holds_slot() {
                continue;
            }
            let minutes = self.resolve_duration(appointment.appointment_type_id).await?;
            windows.push(appointment.window(minutes));
        }
        Ok(windows)
    }

    /// Whether a candidate `[time, time + duration)` booking overlaps any
    /// active appointment of the provider on `date`.
    pub async fn has_conflict(
        &self,
        provider_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: u32,
        exclude: Option<AppointmentId>,
    ) -> Result<bool> {
        if duration_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration(0).into());
        }

        let candidate = TimeWindow::starting_at(date.and_time(time), duration_minutes);
        let busy = self.active_windows(provider_id, date, exclude).await?;
        let conflict = overlaps_any(&candidate, &busy);
        debug!(
            "conflict check for provider {} at {} {} ({} min): {} active windows, conflict={}",
            provider_id,
            date,
            time,
            duration_minutes,
            busy.len(),
            conflict
        );
        Ok(conflict)
    }
}
