use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;

use super::{AppointmentPatch, NewAppointment, PatientQuery, PmsClient};
use crate::models::{Appointment, NewPatient, Operatory, Patient, Provider, Slot};

pub struct HttpPmsClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpPmsClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .with_context(|| format!("failed to call practice API: GET {path}"))?
            .error_for_status()
            .with_context(|| format!("practice API returned error: GET {path}"))?
            .json()
            .await
            .with_context(|| format!("failed to parse practice API response: GET {path}"))
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed to call practice API: POST {path}"))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("practice API error ({status}) on POST {path}: {detail}");
        }
        resp.json()
            .await
            .with_context(|| format!("failed to parse practice API response: POST {path}"))
    }
}

#[async_trait]
impl PmsClient for HttpPmsClient {
    async fn search_patients(&self, query: &PatientQuery) -> anyhow::Result<Vec<Patient>> {
        let mut params = Vec::new();
        if let Some(first) = &query.first_name {
            params.push(("first_name", first.as_str()));
        }
        if let Some(last) = &query.last_name {
            params.push(("last_name", last.as_str()));
        }
        if let Some(phone) = &query.phone {
            params.push(("phone", phone.as_str()));
        }
        self.get_json("/patients", &params).await
    }

    async fn create_patient(&self, new: &NewPatient) -> anyhow::Result<Patient> {
        self.post_json("/patients", new).await
    }

    async fn list_providers(&self) -> anyhow::Result<Vec<Provider>> {
        self.get_json("/providers", &[]).await
    }

    async fn list_operatories(&self) -> anyhow::Result<Vec<Operatory>> {
        self.get_json("/operatories", &[]).await
    }

    async fn appointments_on(
        &self,
        date: NaiveDate,
        operatory_id: Option<&str>,
    ) -> anyhow::Result<Vec<Appointment>> {
        let date = date.format("%Y-%m-%d").to_string();
        let mut params = vec![("date", date.as_str())];
        if let Some(op) = operatory_id {
            params.push(("operatory_id", op));
        }
        self.get_json("/appointments", &params).await
    }

    async fn provider_appointments_on(
        &self,
        date: NaiveDate,
        provider_id: &str,
    ) -> anyhow::Result<Vec<Appointment>> {
        let date = date.format("%Y-%m-%d").to_string();
        self.get_json(
            "/appointments",
            &[("date", date.as_str()), ("provider_id", provider_id)],
        )
        .await
    }

    async fn get_appointment(&self, id: &str) -> anyhow::Result<Appointment> {
        self.get_json(&format!("/appointments/{id}"), &[]).await
    }

    async fn create_appointment(&self, new: &NewAppointment) -> anyhow::Result<Appointment> {
        self.post_json("/appointments", new).await
    }

    async fn update_appointment(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> anyhow::Result<Appointment> {
        let resp = self
            .client
            .put(self.url(&format!("/appointments/{id}")))
            .bearer_auth(&self.api_key)
            .json(patch)
            .send()
            .await
            .context("failed to call practice API: update appointment")?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("practice API error ({status}) updating appointment {id}: {detail}");
        }
        resp.json()
            .await
            .context("failed to parse practice API response: update appointment")
    }

    async fn break_appointment(&self, id: &str) -> anyhow::Result<()> {
        self.client
            .post(self.url(&format!("/appointments/{id}/break")))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("failed to call practice API: break appointment")?
            .error_for_status()
            .context("practice API returned error: break appointment")?;
        Ok(())
    }

    async fn open_slots(&self, date: NaiveDate) -> anyhow::Result<Vec<Slot>> {
        let date = date.format("%Y-%m-%d").to_string();
        self.get_json("/slots", &[("date", date.as_str())]).await
    }
}
