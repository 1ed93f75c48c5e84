//! Booking service: the operations the surrounding application calls.
//!
//! Slot listing and conflict checks are stateless reads, safe under any
//! number of concurrent requests. The conflict-check-then-promote section
//! (acceptance and staff-side direct scheduling) is the one place that needs
//! real mutual exclusion: it runs under a per-provider async lock so two
//! concurrent requests cannot both observe a free slot and both take it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::appointment::{Appointment, AppointmentId, AppointmentState, NewAppointment};
use crate::clock::Clock;
use crate::config::Config;
use crate::directory::{AppointmentTypeDirectory, CareDirectory};
use crate::error::{ConflictError, Result, StoreError, TransitionError, ValidationError};
use crate::schedule::{generate_slots, ConflictGuard, Slot};
use crate::store::AppointmentStore;
use crate::sync::{build_draft, CalendarSyncGateway};

// ============================================================================
// Request / Response Types
// ============================================================================

/// A booking request, patient- or staff-submitted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookingRequest {
    pub patient_id: i64,
    pub provider_id: i64,
    pub appointment_type_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
}

/// Result of a conflict check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct Availability {
    pub available: bool,
    /// The effective duration the check used, after fallback resolution.
    pub duration_minutes: u32,
}

/// The slot listing for one provider and day.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlotList {
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub slots: Vec<Slot>,
}

// ============================================================================
// Booking Service
// ============================================================================

/// Facade over the scheduling core, wiring the conflict guard, the state
/// machine, and calendar propagation together.
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn CareDirectory>,
    types: Arc<dyn AppointmentTypeDirectory>,
    gateway: Arc<dyn CalendarSyncGateway>,
    clock: Arc<dyn Clock>,
    guard: ConflictGuard,
    default_duration_minutes: u32,
    timezone: String,
    provider_locks: std::sync::Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl BookingService {
    /// Create a booking service over the given collaborators.
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        directory: Arc<dyn CareDirectory>,
        types: Arc<dyn AppointmentTypeDirectory>,
        gateway: Arc<dyn CalendarSyncGateway>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let guard = ConflictGuard::new(store.clone(), types.clone())
            .with_default_duration(config.scheduling.default_duration_minutes);
        Self {
            store,
            directory,
            types,
            gateway,
            clock,
            guard,
            default_duration_minutes: config.scheduling.default_duration_minutes,
            timezone: config.calendar.timezone.clone(),
            provider_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// The conflict guard, for callers that only need availability checks.
    pub fn guard(&self) -> &ConflictGuard {
        &self.guard
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// List the bookable slots for a provider on one day.
    ///
    /// The list is regenerated from the store on every call; any slot may
    /// have been taken between this listing and a later booking attempt, so
    /// acceptance always re-checks.
    pub async fn list_slots(
        &self,
        provider_id: i64,
        date: NaiveDate,
        window_start: NaiveTime,
        window_end: NaiveTime,
        appointment_type_id: i64,
    ) -> Result<SlotList> {
        if window_end <= window_start {
            return Err(ValidationError::EmptyWindow {
                start: window_start,
                end: window_end,
            }
            .into());
        }

        let duration_minutes = self.guard.resolve_duration(appointment_type_id).await?;
        let busy = self.guard.active_windows(provider_id, date, None).await?;
        let slots = generate_slots(date, window_start, window_end, duration_minutes, &busy)?;

        Ok(SlotList {
            date,
            duration_minutes,
            slots,
        })
    }

    /// Check whether a candidate slot is free for a provider.
    ///
    /// A taken slot is a normal outcome, reported in the result rather than
    /// as an error.
    pub async fn check_conflict(
        &self,
        provider_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        appointment_type_id: i64,
        exclude: Option<AppointmentId>,
    ) -> Result<Availability> {
        let duration_minutes = self.guard.resolve_duration(appointment_type_id).await?;
        let conflict = self
            .guard
            .has_conflict(provider_id, date, time, duration_minutes, exclude)
            .await?;
        Ok(Availability {
            available: !conflict,
            duration_minutes,
        })
    }

    /// Get an appointment by id.
    pub async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        self.store.get(id).await
    }

    // ========================================================================
    // Booking Lifecycle
    // ========================================================================

    /// Submit a patient booking request.
    ///
    /// The request lands in `pending`: it does not hold the slot, so pending
    /// requests may collide with each other. Only a conflict against an
    /// already confirmed (planned / in-progress) appointment rejects the
    /// submission.
    pub async fn submit_booking(&self, request: BookingRequest) -> Result<Appointment> {
        let appointment = self
            .create_checked(request, AppointmentState::Pending, None)
            .await?;
        info!(
            "patient {} requested appointment {} with provider {} at {} {}",
            appointment.patient_id,
            appointment.id,
            appointment.provider_id,
            appointment.date,
            appointment.time
        );
        Ok(appointment)
    }

    /// Staff-side booking that lands directly in `planned`, holding the slot
    /// and propagating to the calendar.
    pub async fn schedule_direct(
        &self,
        request: BookingRequest,
        admin_id: Option<i64>,
    ) -> Result<Appointment> {
        let provider_id = request.provider_id;
        let lock = self.provider_lock(provider_id);
        let _held = lock.lock().await;

        let appointment = self
            .create_checked(request, AppointmentState::Planned, admin_id)
            .await?;
        drop(_held);

        info!(
            "staff scheduled appointment {} for provider {} at {} {}",
            appointment.id, appointment.provider_id, appointment.date, appointment.time
        );
        self.sync_planned(&appointment).await;
        Ok(appointment)
    }

    /// Accept a pending request, promoting it to `planned`.
    ///
    /// The conflict guard runs again here, under the provider lock: pending
    /// requests are allowed to collide, so the submission-time check is not
    /// enough once one of them is confirmed.
    pub async fn accept_pending(&self, id: AppointmentId) -> Result<Appointment> {
        let mut appointment = self.require(id).await?;

        let lock = self.provider_lock(appointment.provider_id);
        let _held = lock.lock().await;

        appointment.accept().map_err(crate::error::RotaError::from)?;

        let duration_minutes = self
            .guard
            .resolve_duration(appointment.appointment_type_id)
            .await?;
        if self
            .guard
            .has_conflict(
                appointment.provider_id,
                appointment.date,
                appointment.time,
                duration_minutes,
                Some(appointment.id),
            )
            .await?
        {
            return Err(ConflictError {
                provider_id: appointment.provider_id,
                date: appointment.date,
                time: appointment.time,
                duration_minutes,
            }
            .into());
        }

        let appointment = self.store.save(appointment).await?;
        drop(_held);

        info!("appointment {} accepted", appointment.id);
        self.sync_planned(&appointment).await;
        Ok(appointment)
    }

    /// Decline a pending request.
    pub async fn refuse_pending(&self, id: AppointmentId) -> Result<Appointment> {
        let mut appointment = self.require(id).await?;
        appointment.refuse().map_err(crate::error::RotaError::from)?;
        let appointment = self.store.save(appointment).await?;
        info!("appointment {} refused", appointment.id);
        Ok(appointment)
    }

    /// Cancel a pending request or a planned booking.
    pub async fn cancel(&self, id: AppointmentId) -> Result<Appointment> {
        let mut appointment = self.require(id).await?;
        appointment.cancel().map_err(crate::error::RotaError::from)?;
        let appointment = self.store.save(appointment).await?;
        info!("appointment {} cancelled", appointment.id);
        Ok(appointment)
    }

    /// Delete an appointment once it no longer represents a live or pending
    /// calendar hold.
    pub async fn delete(&self, id: AppointmentId) -> Result<bool> {
        let appointment = self.require(id).await?;
        if !appointment.can_delete() {
            return Err(TransitionError::Delete(appointment.state.to_string()).into());
        }
        self.store.delete(id).await
    }

    /// Record a payment confirmation for a planned appointment.
    pub async fn confirm_payment(&self, id: AppointmentId) -> Result<Appointment> {
        let mut appointment = self.require(id).await?;
        appointment
            .confirm_payment(self.clock.now())
            .map_err(crate::error::RotaError::from)?;
        let appointment = self.store.save(appointment).await?;
        info!("appointment {} paid", appointment.id);
        Ok(appointment)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn require(&self, id: AppointmentId) -> Result<Appointment> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::AppointmentNotFound(id).into())
    }

    /// Conflict-check a request against confirmed appointments, then create
    /// it in the given state.
    async fn create_checked(
        &self,
        request: BookingRequest,
        state: AppointmentState,
        admin_id: Option<i64>,
    ) -> Result<Appointment> {
        let duration_minutes = self
            .guard
            .resolve_duration(request.appointment_type_id)
            .await?;
        if self
            .guard
            .has_conflict(
                request.provider_id,
                request.date,
                request.time,
                duration_minutes,
                None,
            )
            .await?
        {
            return Err(ConflictError {
                provider_id: request.provider_id,
                date: request.date,
                time: request.time,
                duration_minutes,
            }
            .into());
        }

        self.store
            .create(NewAppointment {
                date: request.date,
                time: request.time,
                location: request.location,
                state,
                patient_id: request.patient_id,
                provider_id: request.provider_id,
                appointment_type_id: request.appointment_type_id,
                created_by_admin: admin_id,
            })
            .await
    }

    /// Push a freshly planned appointment to the calendar. Failures are
    /// logged and never unwind the transition.
    async fn sync_planned(&self, appointment: &Appointment) {
        let draft = match build_draft(
            appointment,
            self.directory.as_ref(),
            self.types.as_ref(),
            self.default_duration_minutes,
            &self.timezone,
        )
        .await
        {
            Ok(draft) => draft,
            Err(err) => {
                warn!(
                    "could not build calendar event for appointment {}: {}",
                    appointment.id, err
                );
                return;
            }
        };

        if let Err(err) = self.gateway.upsert(&draft).await {
            warn!(
                "calendar sync failed for appointment {}: {}",
                appointment.id, err
            );
        }
    }

    fn provider_lock(&self, provider_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .provider_locks
            .lock()
            .expect("provider lock table poisoned");
        locks
            .entry(provider_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::AppointmentType;
    use crate::clock::FixedClock;
    use crate::directory::{MemoryDirectory, Person};
    use crate::error::RotaError;
    use crate::store::MemoryAppointmentStore;
    use crate::sync::RecordingCalendarGateway;
    use chrono::{TimeZone, Utc};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn request(time: NaiveTime) -> BookingRequest {
        BookingRequest {
            patient_id: 10,
            provider_id: 20,
            appointment_type_id: 30,
            date: day(),
            time,
            location: "Clinic".to_string(),
        }
    }

    async fn service() -> (BookingService, Arc<RecordingCalendarGateway>) {
        let store = Arc::new(MemoryAppointmentStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory.add_patient(Person::new(10, "Amina", "Haddad")).await;
        directory
            .add_provider(Person::new(20, "Nadia", "Benali"))
            .await;
        directory
            .add_type(AppointmentType {
                id: 30,
                label: "Consultation".to_string(),
                price: 60.0,
                duration: Some("30".to_string()),
            })
            .await;

        let gateway = Arc::new(RecordingCalendarGateway::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap(),
        ));

        let service = BookingService::new(
            store,
            directory.clone(),
            directory,
            gateway.clone(),
            clock,
            &Config::default(),
        );
        (service, gateway)
    }

    #[tokio::test]
    async fn test_pending_requests_may_collide() {
        let (service, _) = service().await;

        let first = service.submit_booking(request(t(9, 0))).await.unwrap();
        let second = service.submit_booking(request(t(9, 0))).await.unwrap();
        assert_eq!(first.state, AppointmentState::Pending);
        assert_eq!(second.state, AppointmentState::Pending);
    }

    #[tokio::test]
    async fn test_acceptance_closes_the_collision_window() {
        let (service, gateway) = service().await;

        let first = service.submit_booking(request(t(9, 0))).await.unwrap();
        let second = service.submit_booking(request(t(9, 0))).await.unwrap();

        let accepted = service.accept_pending(first.id).await.unwrap();
        assert_eq!(accepted.state, AppointmentState::Planned);
        assert_eq!(gateway.upsert_count(), 1);

        // The colliding request can no longer be accepted.
        let result = service.accept_pending(second.id).await;
        assert!(matches!(result, Err(RotaError::Conflict(_))));
        assert_eq!(
            service.get(second.id).await.unwrap().unwrap().state,
            AppointmentState::Pending
        );
    }

    #[tokio::test]
    async fn test_submission_rejected_against_confirmed_booking() {
        let (service, _) = service().await;

        let first = service.submit_booking(request(t(9, 0))).await.unwrap();
        service.accept_pending(first.id).await.unwrap();

        // Overlapping the planned 09:00-09:30 booking fails; the adjacent
        // 09:30 slot is fine.
        let result = service.submit_booking(request(t(9, 15))).await;
        assert!(matches!(result, Err(RotaError::Conflict(_))));
        assert!(service.submit_booking(request(t(9, 30))).await.is_ok());
    }

    #[tokio::test]
    async fn test_schedule_direct_lands_planned_and_syncs() {
        let (service, gateway) = service().await;

        let scheduled = service
            .schedule_direct(request(t(10, 0)), Some(99))
            .await
            .unwrap();
        assert_eq!(scheduled.state, AppointmentState::Planned);
        assert_eq!(scheduled.created_by_admin, Some(99));
        assert_eq!(gateway.upsert_count(), 1);
        assert_eq!(gateway.upserts()[0].appointment_id, scheduled.id);
    }

    #[tokio::test]
    async fn test_gateway_failure_does_not_unwind_acceptance() {
        let (service, gateway) = service().await;
        gateway.set_failing(true);

        let submitted = service.submit_booking(request(t(9, 0))).await.unwrap();
        let accepted = service.accept_pending(submitted.id).await.unwrap();
        assert_eq!(accepted.state, AppointmentState::Planned);
        assert_eq!(
            service.get(accepted.id).await.unwrap().unwrap().state,
            AppointmentState::Planned
        );
    }

    #[tokio::test]
    async fn test_refuse_and_cancel() {
        let (service, _) = service().await;

        let refused = service.submit_booking(request(t(9, 0))).await.unwrap();
        let refused = service.refuse_pending(refused.id).await.unwrap();
        assert_eq!(refused.state, AppointmentState::Refused);

        let cancelled = service.submit_booking(request(t(10, 0))).await.unwrap();
        let cancelled = service.cancel(cancelled.id).await.unwrap();
        assert_eq!(cancelled.state, AppointmentState::Cancelled);

        // Refused and cancelled bookings release their slots.
        let availability = service
            .check_conflict(20, day(), t(9, 0), 30, None)
            .await
            .unwrap();
        assert!(availability.available);
    }

    #[tokio::test]
    async fn test_delete_eligibility_enforced() {
        let (service, _) = service().await;

        let planned = service.submit_booking(request(t(9, 0))).await.unwrap();
        service.accept_pending(planned.id).await.unwrap();
        assert!(matches!(
            service.delete(planned.id).await,
            Err(RotaError::Transition(_))
        ));

        service.cancel(planned.id).await.unwrap();
        assert!(service.delete(planned.id).await.unwrap());
        assert!(service.get(planned.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_payment_rules() {
        let (service, _) = service().await;

        let submitted = service.submit_booking(request(t(9, 0))).await.unwrap();
        // Pending requests are not payable.
        assert!(service.confirm_payment(submitted.id).await.is_err());

        service.accept_pending(submitted.id).await.unwrap();
        let paid = service.confirm_payment(submitted.id).await.unwrap();
        assert!(paid.is_paid);
        let first_paid_at = paid.paid_at.unwrap();

        // A second confirmation leaves the original timestamp in place.
        let paid_again = service.confirm_payment(submitted.id).await.unwrap();
        assert_eq!(paid_again.paid_at, Some(first_paid_at));
    }

    #[tokio::test]
    async fn test_check_conflict_excludes_self() {
        let (service, _) = service().await;

        let submitted = service.submit_booking(request(t(9, 0))).await.unwrap();
        let accepted = service.accept_pending(submitted.id).await.unwrap();

        // A no-op edit of the appointment's own slot is always available.
        let availability = service
            .check_conflict(20, day(), t(9, 0), 30, Some(accepted.id))
            .await
            .unwrap();
        assert!(availability.available);

        let availability = service
            .check_conflict(20, day(), t(9, 0), 30, None)
            .await
            .unwrap();
        assert!(!availability.available);
    }

    #[tokio::test]
    async fn test_list_slots_regenerates_per_call() {
        let (service, _) = service().await;

        let before = service
            .list_slots(20, day(), t(8, 0), t(12, 0), 30)
            .await
            .unwrap();
        assert!(before.slots.iter().all(|s| s.available));

        let submitted = service.submit_booking(request(t(9, 0))).await.unwrap();
        service.accept_pending(submitted.id).await.unwrap();

        let after = service
            .list_slots(20, day(), t(8, 0), t(12, 0), 30)
            .await
            .unwrap();
        let taken: Vec<_> = after.slots.iter().filter(|s| !s.available).collect();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].start, t(9, 0));
    }

    #[tokio::test]
    async fn test_list_slots_validation() {
        let (service, _) = service().await;
        assert!(service
            .list_slots(20, day(), t(12, 0), t(8, 0), 30)
            .await
            .is_err());
    }
}
