//! Core appointment types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schedule::TimeWindow;

/// Store-assigned appointment identifier, immutable once assigned.
pub type AppointmentId = i64;

/// Fallback appointment duration when a type's stored duration is absent or
/// unparsable. A defensive default, not a business rule.
pub const DEFAULT_DURATION_MINUTES: u32 = 45;

// ============================================================================
// Appointment State
// ============================================================================

/// Lifecycle state of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentState {
    /// Patient-submitted request awaiting a provider decision.
    #[default]
    Pending,
    /// Accepted booking holding its calendar slot.
    Planned,
    /// The scheduled date is today.
    InProgress,
    /// The scheduled date has passed.
    Done,
    /// Provider declined the pending request.
    Refused,
    /// Patient cancelled.
    Cancelled,
}

impl AppointmentState {
    /// Parse a state from its canonical string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "planned" => Some(Self::Planned),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "refused" => Some(Self::Refused),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Get the state as its canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Refused => "refused",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Refused | Self::Cancelled)
    }

    /// States that hold a real calendar commitment and therefore block a
    /// slot. Pending requests and terminal states do not.
    pub fn holds_slot(&self) -> bool {
        matches!(self, Self::Planned | Self::InProgress)
    }

    /// States the time-driven reconciler may advance. Pending requests await
    /// a human decision; terminal states are settled.
    pub fn is_reconcilable(&self) -> bool {
        matches!(self, Self::Planned | Self::InProgress)
    }
}

impl std::fmt::Display for AppointmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Appointment
// ============================================================================

/// A booked or requested appointment between a patient and a care provider.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Appointment {
    /// Store-assigned identifier.
    pub id: AppointmentId,
    /// Calendar date of the appointment.
    pub date: NaiveDate,
    /// Time of day the appointment starts.
    pub time: NaiveTime,
    /// Free-text location.
    pub location: String,
    /// Current lifecycle state.
    pub state: AppointmentState,
    /// Whether the appointment has been paid.
    #[serde(default)]
    pub is_paid: bool,
    /// Instant of the first payment confirmation; never overwritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    /// Owning patient.
    pub patient_id: i64,
    /// Care provider holding the slot.
    pub provider_id: i64,
    /// Appointment type carrying price and duration.
    pub appointment_type_id: i64,
    /// Admin who created the booking on behalf of the patient, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_admin: Option<i64>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The scheduled start as a combined date-time.
    pub fn start_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// The half-open interval this appointment occupies for the given
    /// effective duration.
    pub fn window(&self, duration_minutes: u32) -> TimeWindow {
        TimeWindow::starting_at(self.start_at(), duration_minutes)
    }
}

/// Creation request for a new appointment; the store assigns id and
/// timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NewAppointment {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub state: AppointmentState,
    pub patient_id: i64,
    pub provider_id: i64,
    pub appointment_type_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_admin: Option<i64>,
}

// ============================================================================
// Appointment Type
// ============================================================================

/// Reference data describing a kind of appointment. Read-only from the
/// scheduling core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppointmentType {
    pub id: i64,
    /// Display label, e.g. "Consultation".
    pub label: String,
    /// Price charged for this appointment type.
    pub price: f64,
    /// Raw duration as entered by staff ("30", "30 min", ...). Parse with
    /// [`AppointmentType::duration_minutes`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl AppointmentType {
    /// Parsed duration in minutes, falling back to the crate default when the
    /// raw value is absent or unparsable.
    pub fn duration_minutes(&self) -> u32 {
        parse_duration_minutes(self.duration.as_deref(), DEFAULT_DURATION_MINUTES)
    }
}

/// Defensively parse a free-text duration field into minutes.
///
/// Accepts a bare number or a number with trailing text ("30 min"). Anything
/// without a positive leading integer yields the fallback.
pub fn parse_duration_minutes(raw: Option<&str>, fallback: u32) -> u32 {
    let Some(raw) = raw else {
        return fallback;
    };
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u32>() {
        Ok(minutes) if minutes > 0 => minutes,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_string_round_trip() {
        for state in [
            AppointmentState::Pending,
            AppointmentState::Planned,
            AppointmentState::InProgress,
            AppointmentState::Done,
            AppointmentState::Refused,
            AppointmentState::Cancelled,
        ] {
            assert_eq!(AppointmentState::parse(state.as_str()), Some(state));
        }
        assert_eq!(AppointmentState::parse("scheduled"), None);
        assert_eq!(AppointmentState::parse("PLANNED"), None);
    }

    #[test]
    fn test_state_classification() {
        assert!(!AppointmentState::Pending.holds_slot());
        assert!(AppointmentState::Planned.holds_slot());
        assert!(AppointmentState::InProgress.holds_slot());
        assert!(!AppointmentState::Cancelled.holds_slot());

        assert!(AppointmentState::Done.is_terminal());
        assert!(AppointmentState::Refused.is_terminal());
        assert!(AppointmentState::Cancelled.is_terminal());
        assert!(!AppointmentState::Planned.is_terminal());

        assert!(!AppointmentState::Pending.is_reconcilable());
        assert!(AppointmentState::Planned.is_reconcilable());
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration_minutes(Some("30"), 45), 30);
        assert_eq!(parse_duration_minutes(Some(" 90 "), 45), 90);
        assert_eq!(parse_duration_minutes(Some("30 min"), 45), 30);
        // Defensive fallback: absent, empty, or unparsable values never fail
        // the computation.
        assert_eq!(parse_duration_minutes(None, 45), 45);
        assert_eq!(parse_duration_minutes(Some(""), 45), 45);
        assert_eq!(parse_duration_minutes(Some("half an hour"), 45), 45);
        assert_eq!(parse_duration_minutes(Some("0"), 45), 45);
    }

    #[test]
    fn test_type_duration_fallback() {
        let kind = AppointmentType {
            id: 1,
            label: "Consultation".to_string(),
            price: 50.0,
            duration: Some("???".to_string()),
        };
        assert_eq!(kind.duration_minutes(), DEFAULT_DURATION_MINUTES);
    }
}
