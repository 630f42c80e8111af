pub mod http;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{Appointment, AppointmentStatus, NewPatient, Operatory, Patient, Provider, Slot};

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl PatientQuery {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub patient_id: String,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub provider_id: String,
    pub operatory_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// "asap" when the caller wants to be moved up; some deployments reject
    /// this field, see the strip-and-retry rules in the decision service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operatory_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

/// Remote practice-management data API. Reads are safe to retry; creates are
/// guarded by the per-call booking state instead of being retried blindly.
#[async_trait]
pub trait PmsClient: Send + Sync {
    async fn search_patients(&self, query: &PatientQuery) -> anyhow::Result<Vec<Patient>>;
    async fn create_patient(&self, new: &NewPatient) -> anyhow::Result<Patient>;
    async fn list_providers(&self) -> anyhow::Result<Vec<Provider>>;
    async fn list_operatories(&self) -> anyhow::Result<Vec<Operatory>>;
    /// Appointments starting on `date`, optionally scoped to one operatory.
    async fn appointments_on(
        &self,
        date: NaiveDate,
        operatory_id: Option<&str>,
    ) -> anyhow::Result<Vec<Appointment>>;
    async fn provider_appointments_on(
        &self,
        date: NaiveDate,
        provider_id: &str,
    ) -> anyhow::Result<Vec<Appointment>>;
    async fn get_appointment(&self, id: &str) -> anyhow::Result<Appointment>;
    async fn create_appointment(&self, new: &NewAppointment) -> anyhow::Result<Appointment>;
    async fn update_appointment(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> anyhow::Result<Appointment>;
    /// Mark an appointment broken (the practice's cancel).
    async fn break_appointment(&self, id: &str) -> anyhow::Result<()>;
    async fn open_slots(&self, date: NaiveDate) -> anyhow::Result<Vec<Slot>>;
}
