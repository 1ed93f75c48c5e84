//! In-memory appointment store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::appointment::{Appointment, AppointmentId, NewAppointment};
use crate::error::{Result, StoreError};

use super::traits::{AppointmentStore, StateChange};

/// Embedded appointment store backed by a `HashMap`.
///
/// Suitable for tests and single-process deployments; each method takes the
/// lock for its whole critical section, so the isolation required by the
/// conflict guard holds within one process.
pub struct MemoryAppointmentStore {
    appointments: RwLock<HashMap<AppointmentId, Appointment>>,
    next_id: AtomicI64,
}

impl MemoryAppointmentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            appointments: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored appointments.
    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    /// Whether the store holds no appointments.
    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }
}

impl Default for MemoryAppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn create(&self, new: NewAppointment) -> Result<Appointment> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let appointment = Appointment {
            id,
            date: new.date,
            time: new.time,
            location: new.location,
            state: new.state,
            is_paid: false,
            paid_at: None,
            patient_id: new.patient_id,
            provider_id: new.provider_id,
            appointment_type_id: new.appointment_type_id,
            created_by_admin: new.created_by_admin,
            created_at: now,
            updated_at: now,
        };

        let mut appointments = self.appointments.write().await;
        appointments.insert(id, appointment.clone());
        debug!(
            "created appointment {} for provider {} at {} {}",
            id, appointment.provider_id, appointment.date, appointment.time
        );
        Ok(appointment)
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        let appointments = self.appointments.read().await;
        Ok(appointments.get(&id).cloned())
    }

    async fn save(&self, mut appointment: Appointment) -> Result<Appointment> {
        let mut appointments = self.appointments.write().await;
        if !appointments.contains_key(&appointment.id) {
            return Err(StoreError::AppointmentNotFound(appointment.id).into());
        }
        appointment.updated_at = Utc::now();
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn delete(&self, id: AppointmentId) -> Result<bool> {
        let mut appointments = self.appointments.write().await;
        Ok(appointments.remove(&id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut all: Vec<Appointment> = appointments.values().cloned().collect();
        all.sort_by_key(|a| (a.date, a.time, a.id));
        Ok(all)
    }

    async fn list_for_provider_on(
        &self,
        provider_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut matching: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.provider_id == provider_id && a.date == date)
            .cloned()
            .collect();
        matching.sort_by_key(|a| (a.time, a.id));
        Ok(matching)
    }

    async fn apply_states(&self, changes: &[StateChange]) -> Result<usize> {
        let mut appointments = self.appointments.write().await;
        let now = Utc::now();
        let mut applied = 0;
        for change in changes {
            match appointments.get_mut(&change.id) {
                Some(appointment) => {
                    appointment.state = change.state;
                    appointment.updated_at = now;
                    applied += 1;
                }
                None => {
                    warn!("skipping state change for vanished appointment {}", change.id);
                }
            }
        }
        Ok(applied)
    }
}
