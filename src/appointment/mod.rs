//! Appointment entity and lifecycle state machine.
//!
//! An appointment moves through a closed set of states:
//!
//! ```text
//!                    accept              date == today        date < today
//!   (submit) PENDING ──────▶ PLANNED ──────────▶ IN_PROGRESS ──────▶ DONE
//!               │               │
//!        refuse │        cancel │ (also from PENDING)
//!               ▼               ▼
//!            REFUSED        CANCELLED
//! ```
//!
//! `PLANNED` and `IN_PROGRESS` are the slot-holding states that block a
//! provider's calendar; `PENDING` requests do not. The time-driven arrows are
//! walked exclusively by the reconciler.

mod lifecycle;
mod types;

pub use lifecycle::time_driven_state;
pub use types::{
    parse_duration_minutes, Appointment, AppointmentId, AppointmentState, AppointmentType,
    NewAppointment, DEFAULT_DURATION_MINUTES,
};
