//! Appointment storage trait.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::appointment::{Appointment, AppointmentId, AppointmentState, NewAppointment};
use crate::error::Result;

/// A pending state change produced by a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub id: AppointmentId,
    pub state: AppointmentState,
}

/// Trait for appointment storage backends.
///
/// State transitions must read and write through this trait with enough
/// isolation that a single appointment has one writer at a time; the service
/// layer serializes the conflict-check-then-promote section per provider on
/// top of that.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Persist a new appointment, assigning its id and timestamps.
    async fn create(&self, new: NewAppointment) -> Result<Appointment>;

    /// Get an appointment by id.
    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>>;

    /// Persist the full record of an existing appointment.
    async fn save(&self, appointment: Appointment) -> Result<Appointment>;

    /// Delete an appointment by id. Returns whether a record was removed.
    async fn delete(&self, id: AppointmentId) -> Result<bool>;

    /// List every appointment, ordered by schedule.
    async fn list_all(&self) -> Result<Vec<Appointment>>;

    /// All appointments of one provider scheduled on `date`, any state,
    /// ordered by time.
    async fn list_for_provider_on(
        &self,
        provider_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>>;

    /// Apply a batch of state changes in one shot. Returns the number of
    /// records actually updated; changes for ids that vanished since the scan
    /// are skipped, not errors.
    async fn apply_states(&self, changes: &[StateChange]) -> Result<usize>;
}
