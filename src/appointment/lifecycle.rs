//! Lifecycle transitions for a single appointment.
//!
//! Human-driven transitions (accept, refuse, cancel, payment) live here as
//! methods that validate the current state and mutate in place; persisting
//! the result is the caller's job. The time-driven rule used by the
//! reconciler is a pure function of the scheduled date and "today".

use chrono::{DateTime, NaiveDate, Utc};

use super::types::{Appointment, AppointmentState};
use crate::error::TransitionError;

impl Appointment {
    /// Accept a pending request, promoting it to a slot-holding booking.
    ///
    /// The conflict guard must be re-run before persisting an acceptance;
    /// this method only enforces the state machine.
    pub fn accept(&mut self) -> Result<(), TransitionError> {
        match self.state {
            AppointmentState::Pending => {
                self.state = AppointmentState::Planned;
                Ok(())
            }
            other => Err(TransitionError::Accept(other.to_string())),
        }
    }

    /// Decline a pending request.
    pub fn refuse(&mut self) -> Result<(), TransitionError> {
        match self.state {
            AppointmentState::Pending => {
                self.state = AppointmentState::Refused;
                Ok(())
            }
            other => Err(TransitionError::Refuse(other.to_string())),
        }
    }

    /// Cancel a request or a planned booking on the patient's behalf.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        match self.state {
            AppointmentState::Pending | AppointmentState::Planned => {
                self.state = AppointmentState::Cancelled;
                Ok(())
            }
            other => Err(TransitionError::Cancel(other.to_string())),
        }
    }

    /// Record a payment confirmation.
    ///
    /// Only a planned (accepted, not yet elapsed) appointment is payable.
    /// `paid_at` is fixed at the first confirmation; later attempts are
    /// accepted but change nothing.
    pub fn confirm_payment(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.state != AppointmentState::Planned {
            return Err(TransitionError::Payment(self.state.to_string()));
        }
        if !self.is_paid {
            self.is_paid = true;
            self.paid_at = Some(now);
        }
        Ok(())
    }

    /// Whether the owning patient may delete this record: only once it no
    /// longer represents a live or pending calendar hold.
    pub fn can_delete(&self) -> bool {
        matches!(
            self.state,
            AppointmentState::Cancelled | AppointmentState::Done | AppointmentState::Refused
        )
    }

    /// The state the reconciler would assign given "today", or `None` when
    /// nothing changes or the appointment must not be touched.
    pub fn reconciled_state(&self, today: NaiveDate) -> Option<AppointmentState> {
        if !self.state.is_reconcilable() {
            return None;
        }
        let next = time_driven_state(self.date, today);
        (next != self.state).then_some(next)
    }
}

/// Time-driven state for a slot-holding appointment: future dates stay
/// planned, the scheduled day is in progress, past dates are done.
pub fn time_driven_state(scheduled: NaiveDate, today: NaiveDate) -> AppointmentState {
    if scheduled > today {
        AppointmentState::Planned
    } else if scheduled == today {
        AppointmentState::InProgress
    } else {
        AppointmentState::Done
    }
}
