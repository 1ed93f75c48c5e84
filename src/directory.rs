//! Read-only directories for people and appointment types.
//!
//! The scheduling core never mutates these records; it looks them up to
//! resolve durations and to build display strings for calendar events.

use std::collections::HashMap;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::appointment::AppointmentType;
use crate::error::Result;

/// Identity fields of a patient or provider, for display only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Person {
    pub fn new(id: i64, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: None,
        }
    }

    /// Set the phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Display name, trimmed of stray whitespace from empty components.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Read-only lookup of patients and providers.
#[async_trait]
pub trait CareDirectory: Send + Sync {
    async fn provider(&self, id: i64) -> Result<Option<Person>>;
    async fn patient(&self, id: i64) -> Result<Option<Person>>;
}

/// Read-only lookup of appointment types.
#[async_trait]
pub trait AppointmentTypeDirectory: Send + Sync {
    async fn appointment_type(&self, id: i64) -> Result<Option<AppointmentType>>;
}

/// In-memory directory implementing both lookups; used by tests and embedded
/// deployments.
pub struct MemoryDirectory {
    providers: RwLock<HashMap<i64, Person>>,
    patients: RwLock<HashMap<i64, Person>>,
    types: RwLock<HashMap<i64, AppointmentType>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            patients: RwLock::new(HashMap::new()),
            types: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_provider(&self, person: Person) {
        self.providers.write().await.insert(person.id, person);
    }

    pub async fn add_patient(&self, person: Person) {
        self.patients.write().await.insert(person.id, person);
    }

    pub async fn add_type(&self, kind: AppointmentType) {
        self.types.write().await.insert(kind.id, kind);
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CareDirectory for MemoryDirectory {
    async fn provider(&self, id: i64) -> Result<Option<Person>> {
        Ok(self.providers.read().await.get(&id).cloned())
    }

    async fn patient(&self, id: i64) -> Result<Option<Person>> {
        Ok(self.patients.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl AppointmentTypeDirectory for MemoryDirectory {
    async fn appointment_type(&self, id: i64) -> Result<Option<AppointmentType>> {
        Ok(self.types.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_lookups() {
        let directory = MemoryDirectory::new();
        directory
            .add_provider(Person::new(1, "Nadia", "Benali"))
            .await;
        directory
            .add_type(AppointmentType {
                id: 7,
                label: "Consultation".to_string(),
                price: 60.0,
                duration: Some("30".to_string()),
            })
            .await;

        let provider = directory.provider(1).await.unwrap().unwrap();
        assert_eq!(provider.full_name(), "Nadia Benali");
        assert!(directory.provider(2).await.unwrap().is_none());
        assert!(directory.patient(1).await.unwrap().is_none());

        let kind = directory.appointment_type(7).await.unwrap().unwrap();
        assert_eq!(kind.duration_minutes(), 30);
    }

    #[test]
    fn test_full_name_trims_empty_components() {
        let person = Person::new(1, "", "Benali");
        assert_eq!(person.full_name(), "Benali");
    }
}
