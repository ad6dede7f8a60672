//! Supabase Auth and PostgREST adapters.
//!
//! Appointments rely on the `UNIQUE (payment_reference)` constraint from
//! `migrations/0001_create_appointments.sql`. Inserts use
//! `Prefer: resolution=ignore-duplicates`, so concurrent writers in any number
//! of processes resolve to a single row.

use super::http_client::{check_status, trim_base};
use crate::config::SupabaseConfig;
use crate::domain::appointment::{Appointment, InsertOutcome, NewAppointment};
use crate::domain::identity::IdentityUser;
use crate::domain::ports::{AppointmentRepository, IdentityProvider, ProviderResult};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

const APPOINTMENTS_TABLE: &str = "appointments";

/// Resolves bearer tokens through `GET /auth/v1/user`.
pub struct SupabaseIdentityProvider {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl SupabaseIdentityProvider {
    pub fn new(config: &SupabaseConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: trim_base(&config.url),
            anon_key: config.anon_key.clone(),
            client,
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn get_user(&self, token: &str) -> ProviderResult<IdentityUser> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<IdentityUser>().await?)
    }
}

/// Appointment table accessed through PostgREST with the service role key.
pub struct SupabaseAppointmentRepository {
    base_url: String,
    service_role_key: String,
    client: reqwest::Client,
}

impl SupabaseAppointmentRepository {
    pub fn new(base_url: &str, service_role_key: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: trim_base(base_url),
            service_role_key: service_role_key.to_string(),
            client,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, APPOINTMENTS_TABLE)
    }

    fn auth_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.service_role_key)
            .map_err(|e| ProviderError::Transport(format!("invalid service role key: {}", e)))?;
        headers.insert("apikey", key);
        Ok(headers)
    }

    async fn find_by_reference(&self, payment_reference: &str) -> ProviderResult<Option<Appointment>> {
        let response = self
            .client
            .get(self.table_url())
            .headers(self.auth_headers()?)
            .bearer_auth(&self.service_role_key)
            .query(&[
                ("payment_reference", format!("eq.{}", payment_reference)),
                ("select", "*".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<Appointment> = check_status(response).await?.json().await?;
        Ok(with_currency_scale(rows).into_iter().next())
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn insert_or_fetch(&self, appointment: NewAppointment) -> ProviderResult<InsertOutcome> {
        let appointment = appointment.into_appointment();
        let mut headers = self.auth_headers()?;
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=ignore-duplicates,return=representation"),
        );

        let response = self
            .client
            .post(self.table_url())
            .headers(headers)
            .bearer_auth(&self.service_role_key)
            .query(&[("on_conflict", "payment_reference")])
            .json(&[&appointment])
            .send()
            .await?;
        let inserted: Vec<Appointment> = check_status(response).await?.json().await?;

        if let Some(created) = with_currency_scale(inserted).into_iter().next() {
            return Ok(InsertOutcome::Created(created));
        }

        // The insert was ignored: another request owns this payment reference.
        debug!(
            payment_reference = %appointment.payment_reference,
            "duplicate payment reference, fetching existing appointment"
        );
        self.find_by_reference(&appointment.payment_reference)
            .await?
            .map(InsertOutcome::Existing)
            .ok_or_else(|| {
                ProviderError::Storage(format!(
                    "insert for payment reference {} was ignored but no row exists",
                    appointment.payment_reference
                ))
            })
    }
}

/// PostgREST renders `numeric` columns as JSON numbers, so `150.00` arrives as `150`.
fn with_currency_scale(rows: Vec<Appointment>) -> Vec<Appointment> {
    rows.into_iter().map(Appointment::with_currency_scale).collect()
}
