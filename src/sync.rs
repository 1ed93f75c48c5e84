//! Calendar sync gateway for mirroring confirmed appointments into an
//! external calendar.
//!
//! The gateway is idempotent per appointment id: the HTTP implementation
//! looks an event up by a private extended property carrying the appointment
//! id and patches it if found, so repeated upserts are safe. Callers treat
//! every failure as logged and non-fatal; the state transition that triggered
//! the sync is never rolled back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::appointment::{Appointment, AppointmentId, AppointmentType};
use crate::config::CalendarSyncConfig;
use crate::directory::{AppointmentTypeDirectory, CareDirectory, Person};
use crate::error::{GatewayError, Result};

// ============================================================================
// Event Draft
// ============================================================================

/// Snapshot of a confirmed appointment pushed to the external calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventDraft {
    pub appointment_id: AppointmentId,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub timezone: String,
}

impl CalendarEventDraft {
    /// Build the draft for an appointment from directory records. Missing
    /// directory entries degrade to placeholder strings; they never block a
    /// sync.
    pub fn for_appointment(
        appointment: &Appointment,
        patient: Option<&Person>,
        provider: Option<&Person>,
        kind: Option<&AppointmentType>,
        duration_minutes: u32,
        timezone: &str,
    ) -> Self {
        let patient_name = patient
            .map(Person::full_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Patient".to_string());
        let provider_name = provider
            .map(Person::full_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "-".to_string());
        let care_type = kind
            .map(|k| k.label.clone())
            .unwrap_or_else(|| "Appointment".to_string());
        let phone = patient
            .and_then(|p| p.phone.clone())
            .unwrap_or_else(|| "-".to_string());

        let description = [
            format!("Patient: {patient_name}"),
            format!("Phone: {phone}"),
            format!("Care type: {care_type}"),
            format!("Medical staff: {provider_name}"),
            format!("Status: {}", appointment.state),
            format!("Location: {}", appointment.location),
        ]
        .join("\n");

        let start = appointment.start_at();
        let end = start + chrono::Duration::minutes(i64::from(duration_minutes));

        Self {
            appointment_id: appointment.id,
            summary: format!("{patient_name} - {care_type}"),
            description,
            location: appointment.location.clone(),
            start,
            end,
            timezone: timezone.to_string(),
        }
    }
}

/// Resolve directory records and build a calendar draft for an appointment.
pub async fn build_draft(
    appointment: &Appointment,
    directory: &dyn CareDirectory,
    types: &dyn AppointmentTypeDirectory,
    default_duration_minutes: u32,
    timezone: &str,
) -> Result<CalendarEventDraft> {
    let patient = directory.patient(appointment.patient_id).await?;
    let provider = directory.provider(appointment.provider_id).await?;
    let kind = types
        .appointment_type(appointment.appointment_type_id)
        .await?;
    let duration_minutes = kind
        .as_ref()
        .map(|k| {
            crate::appointment::parse_duration_minutes(
                k.duration.as_deref(),
                default_duration_minutes,
            )
        })
        .unwrap_or(default_duration_minutes);

    Ok(CalendarEventDraft::for_appointment(
        appointment,
        patient.as_ref(),
        provider.as_ref(),
        kind.as_ref(),
        duration_minutes,
        timezone,
    ))
}

// ============================================================================
// Gateway Trait
// ============================================================================

/// External calendar system mirroring confirmed appointments.
#[async_trait]
pub trait CalendarSyncGateway: Send + Sync {
    /// Upsert the event for this appointment. Idempotent per appointment id;
    /// lookup-before-create is the gateway's responsibility.
    async fn upsert(&self, draft: &CalendarEventDraft) -> Result<()>;
}

// ============================================================================
// Google Calendar Gateway
// ============================================================================

/// Google Calendar implementation of the sync gateway.
///
/// Events are keyed by a private extended property `appointment_id`; an
/// existing event is patched, otherwise a new one is inserted.
pub struct GoogleCalendarGateway {
    client: Client,
    config: CalendarSyncConfig,
}

impl GoogleCalendarGateway {
    /// Create a gateway from configuration.
    pub fn new(config: CalendarSyncConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("rota/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    /// Whether sync is switched on and credentials are complete.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
            && !self.config.calendar_id.is_empty()
            && !self.config.token.is_empty()
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.calendar_id
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), event_id)
    }

    /// Build the Google event payload for a draft.
    fn event_payload(&self, draft: &CalendarEventDraft) -> serde_json::Value {
        let format = "%Y-%m-%dT%H:%M:%S";
        serde_json::json!({
            "summary": draft.summary,
            "description": draft.description,
            "location": draft.location,
            "start": {
                "dateTime": draft.start.format(format).to_string(),
                "timeZone": draft.timezone,
            },
            "end": {
                "dateTime": draft.end.format(format).to_string(),
                "timeZone": draft.timezone,
            },
            "extendedProperties": {
                "private": {
                    "appointment_id": draft.appointment_id.to_string(),
                    "source": "rota",
                },
            },
        })
    }

    /// Find the calendar event previously created for this appointment.
    async fn find_event_id(&self, appointment_id: AppointmentId) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.events_url())
            .bearer_auth(&self.config.token)
            .query(&[
                (
                    "privateExtendedProperty",
                    format!("appointment_id={appointment_id}"),
                ),
                ("maxResults", "1".to_string()),
                ("singleEvents", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Response(e.to_string()))?;

        let event_id = payload
            .get("items")
            .and_then(|items| items.get(0))
            .and_then(|item| item.get("id"))
            .and_then(|id| id.as_str())
            .map(|id| id.to_string());

        Ok(event_id)
    }
}

#[async_trait]
impl CalendarSyncGateway for GoogleCalendarGateway {
    async fn upsert(&self, draft: &CalendarEventDraft) -> Result<()> {
        if !self.is_enabled() {
            return Err(GatewayError::Disabled.into());
        }

        let payload = self.event_payload(draft);
        let request = match self.find_event_id(draft.appointment_id).await? {
            Some(event_id) => self.client.patch(self.event_url(&event_id)),
            None => self.client.post(self.events_url()),
        };

        let response = request
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        debug!(
            "calendar upsert succeeded for appointment {}",
            draft.appointment_id
        );
        Ok(())
    }
}

// ============================================================================
// Null and Recording Gateways
// ============================================================================

/// Gateway used when calendar sync is disabled; accepts everything and does
/// nothing.
pub struct NullCalendarGateway;

#[async_trait]
impl CalendarSyncGateway for NullCalendarGateway {
    async fn upsert(&self, draft: &CalendarEventDraft) -> Result<()> {
        debug!(
            "calendar sync disabled; skipping upsert for appointment {}",
            draft.appointment_id
        );
        Ok(())
    }
}

/// Gateway that records every upsert in memory; the test double for sync
/// behavior, with an optional failure switch.
#[derive(Default)]
pub struct RecordingCalendarGateway {
    upserts: std::sync::Mutex<Vec<CalendarEventDraft>>,
    fail: AtomicBool,
}

impl RecordingCalendarGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upsert fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Drafts received so far.
    pub fn upserts(&self) -> Vec<CalendarEventDraft> {
        self.upserts.lock().expect("gateway mutex poisoned").clone()
    }

    /// Number of upserts received so far.
    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().expect("gateway mutex poisoned").len()
    }
}

#[async_trait]
impl CalendarSyncGateway for RecordingCalendarGateway {
    async fn upsert(&self, draft: &CalendarEventDraft) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("simulated outage".to_string()).into());
        }
        self.upserts
            .lock()
            .expect("gateway mutex poisoned")
            .push(draft.clone());
        Ok(())
    }
}
