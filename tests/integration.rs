//! End-to-end scenarios for the scheduling core.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

use rota::{
    AppointmentState, AppointmentType, BookingRequest, BookingService, Clock, Config, FixedClock,
    MemoryAppointmentStore, MemoryDirectory, Person, Reconciler, RecordingCalendarGateway,
    RotaError,
};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
}

fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

struct Harness {
    service: BookingService,
    reconciler: Reconciler,
    gateway: Arc<RecordingCalendarGateway>,
    clock: Arc<FixedClock>,
}

/// Provider 1 with a 30-minute consultation type (id 1) and a type with an
/// unparsable duration (id 2).
async fn harness() -> Harness {
    init_tracing();

    let store = Arc::new(MemoryAppointmentStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    directory.add_patient(Person::new(1, "Amina", "Haddad")).await;
    directory.add_patient(Person::new(2, "Karim", "Slimani")).await;
    directory.add_provider(Person::new(1, "Nadia", "Benali")).await;
    directory
        .add_type(AppointmentType {
            id: 1,
            label: "Consultation".to_string(),
            price: 60.0,
            duration: Some("30".to_string()),
        })
        .await;
    directory
        .add_type(AppointmentType {
            id: 2,
            label: "Follow-up".to_string(),
            price: 40.0,
            duration: Some("".to_string()),
        })
        .await;

    let gateway = Arc::new(RecordingCalendarGateway::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap(),
    ));
    let config = Config::default();

    let service = BookingService::new(
        store.clone(),
        directory.clone(),
        directory.clone(),
        gateway.clone(),
        clock.clone(),
        &config,
    );
    let reconciler = Reconciler::new(
        store,
        directory.clone(),
        directory,
        gateway.clone(),
        &config,
    );

    Harness {
        service,
        reconciler,
        gateway,
        clock,
    }
}

fn request(patient_id: i64, time: NaiveTime, type_id: i64) -> BookingRequest {
    BookingRequest {
        patient_id,
        provider_id: 1,
        appointment_type_id: type_id,
        date: day(),
        time,
        location: "Clinic".to_string(),
    }
}

#[tokio::test]
async fn morning_slot_listing_with_one_planned_booking() {
    let h = harness().await;

    // One confirmed 09:00-09:30 booking.
    let submitted = h
        .service
        .submit_booking(request(1, t(9, 0), 1))
        .await
        .unwrap();
    h.service.accept_pending(submitted.id).await.unwrap();

    // Working window 08:00-12:00 with 30-minute slots: exactly 8 slots, only
    // 09:00 taken.
    let listing = h
        .service
        .list_slots(1, day(), t(8, 0), t(12, 0), 1)
        .await
        .unwrap();

    assert_eq!(listing.duration_minutes, 30);
    assert_eq!(listing.slots.len(), 8);
    for slot in &listing.slots {
        if slot.start == t(9, 0) {
            assert!(!slot.available);
        } else {
            assert!(slot.available, "slot at {} should be free", slot.start);
        }
    }
}

#[tokio::test]
async fn unparsable_duration_falls_back_to_45_minutes() {
    let h = harness().await;

    // Type 2 stores an empty duration string; the defensive default kicks
    // in: 08:00-11:00 yields four 45-minute slots.
    let listing = h
        .service
        .list_slots(1, day(), t(8, 0), t(11, 0), 2)
        .await
        .unwrap();

    assert_eq!(listing.duration_minutes, 45);
    assert_eq!(listing.slots.len(), 4);
    assert_eq!(listing.slots[0].end, t(8, 45));
}

#[tokio::test]
async fn booking_journey_from_request_to_deletion() {
    let h = harness().await;

    // Two patients request the same slot; both may sit in pending.
    let first = h
        .service
        .submit_booking(request(1, t(9, 0), 1))
        .await
        .unwrap();
    let second = h
        .service
        .submit_booking(request(2, t(9, 0), 1))
        .await
        .unwrap();
    assert_eq!(first.state, AppointmentState::Pending);
    assert_eq!(second.state, AppointmentState::Pending);

    // The provider confirms the first; the calendar mirror fires once.
    let planned = h.service.accept_pending(first.id).await.unwrap();
    assert_eq!(planned.state, AppointmentState::Planned);
    assert_eq!(h.gateway.upsert_count(), 1);

    // The second request lost the race and can only be refused.
    assert!(matches!(
        h.service.accept_pending(second.id).await,
        Err(RotaError::Conflict(_))
    ));
    h.service.refuse_pending(second.id).await.unwrap();

    // Payment is accepted while planned.
    let paid = h.service.confirm_payment(first.id).await.unwrap();
    assert!(paid.is_paid);

    // Two days later the appointment day arrives, then passes.
    h.clock
        .set(Utc.with_ymd_and_hms(2025, 3, 12, 9, 15, 0).unwrap());
    let outcome = h.reconciler.reconcile_all(h.clock.now()).await.unwrap();
    assert_eq!(outcome.transitioned, 1);
    assert_eq!(
        h.service.get(first.id).await.unwrap().unwrap().state,
        AppointmentState::InProgress
    );

    h.clock
        .set(Utc.with_ymd_and_hms(2025, 3, 13, 9, 0, 0).unwrap());
    h.reconciler.reconcile_all(h.clock.now()).await.unwrap();
    assert_eq!(
        h.service.get(first.id).await.unwrap().unwrap().state,
        AppointmentState::Done
    );

    // Done and refused appointments may be deleted by their patients.
    assert!(h.service.delete(first.id).await.unwrap());
    assert!(h.service.delete(second.id).await.unwrap());

    // No reconciliation transition ever re-entered planned, so the only
    // calendar call remains the acceptance-time one.
    assert_eq!(h.gateway.upsert_count(), 1);
}

#[tokio::test]
async fn repeated_reconciliation_changes_nothing() {
    let h = harness().await;

    let submitted = h
        .service
        .submit_booking(request(1, t(9, 0), 1))
        .await
        .unwrap();
    h.service.accept_pending(submitted.id).await.unwrap();

    h.clock
        .set(Utc.with_ymd_and_hms(2025, 3, 12, 9, 15, 0).unwrap());
    let now = h.clock.now();

    let first = h.reconciler.reconcile_all(now).await.unwrap();
    let syncs = h.gateway.upsert_count();
    let second = h.reconciler.reconcile_all(now).await.unwrap();

    assert_eq!(first.transitioned, 1);
    assert_eq!(second.transitioned, 0);
    assert_eq!(h.gateway.upsert_count(), syncs);
}

#[tokio::test]
async fn boundary_slots_do_not_conflict() {
    let h = harness().await;

    let submitted = h
        .service
        .submit_booking(request(1, t(10, 0), 1))
        .await
        .unwrap();
    h.service.accept_pending(submitted.id).await.unwrap();

    // [10:00, 10:30) is held; 09:45 overlaps it, 10:30 only touches it.
    let overlapping = h
        .service
        .check_conflict(1, day(), t(9, 45), 1, None)
        .await
        .unwrap();
    assert!(!overlapping.available);

    let adjacent = h
        .service
        .check_conflict(1, day(), t(10, 30), 1, None)
        .await
        .unwrap();
    assert!(adjacent.available);
}
