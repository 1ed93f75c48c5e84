//! Rota: Clinic Appointment Scheduling Core
//!
//! The scheduling subsystem of a clinic operations platform: slot
//! availability with overlap detection, the booking lifecycle state machine,
//! time-driven reconciliation, and propagation of confirmed appointments to
//! an external calendar.
//!
//! Persistence, identity, payment checkout, and the web layer are external
//! collaborators reached through the traits in [`store`], [`directory`],
//! [`sync`], and [`clock`]; in-memory implementations ship for tests and
//! embedded use.
//!
//! ```ignore
//! use rota::{BookingService, BookingRequest, Config, MemoryAppointmentStore,
//!            MemoryDirectory, NullCalendarGateway, SystemClock};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryAppointmentStore::new());
//! let directory = Arc::new(MemoryDirectory::new());
//! let service = BookingService::new(
//!     store,
//!     directory.clone(),
//!     directory,
//!     Arc::new(NullCalendarGateway),
//!     Arc::new(SystemClock),
//!     &Config::load()?,
//! );
//!
//! // A patient requests a slot...
//! let pending = service.submit_booking(request).await?;
//! // ...the provider confirms it, re-checking the slot.
//! let planned = service.accept_pending(pending.id).await?;
//! ```

pub mod appointment;
pub mod booking;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod reconcile;
pub mod schedule;
pub mod store;
pub mod sync;

pub use appointment::{
    parse_duration_minutes, time_driven_state, Appointment, AppointmentId, AppointmentState,
    AppointmentType, NewAppointment, DEFAULT_DURATION_MINUTES,
};
pub use booking::{Availability, BookingRequest, BookingService, SlotList};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CalendarSyncConfig, Config, ReconcilerConfig, SchedulingConfig};
pub use directory::{AppointmentTypeDirectory, CareDirectory, MemoryDirectory, Person};
pub use error::{
    ConfigError, ConflictError, GatewayError, Result, RotaError, StoreError, TransitionError,
    ValidationError,
};
pub use reconcile::{run_reconciler_loop, ReconcileOutcome, Reconciler};
pub use schedule::{generate_slots, overlaps, overlaps_any, ConflictGuard, Slot, TimeWindow};
pub use store::{AppointmentStore, MemoryAppointmentStore, StateChange};
pub use sync::{
    build_draft, CalendarEventDraft, CalendarSyncGateway, GoogleCalendarGateway,
    NullCalendarGateway, RecordingCalendarGateway,
};
