use super::money::{Currency, MinorUnits, Money};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const META_PATIENT_NAME: &str = "patient_name";
pub const META_APPOINTMENT_TYPE: &str = "appointment_type";
pub const META_APPOINTMENT_DATE: &str = "appointment_date";
pub const META_APPOINTMENT_TIME: &str = "appointment_time";
pub const META_CONTACT_NUMBER: &str = "contact_number";

/// Settlement status of a checkout session as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Paid => f.write_str("paid"),
            PaymentStatus::Unpaid => f.write_str("unpaid"),
            PaymentStatus::NoPaymentRequired => f.write_str("no_payment_required"),
            PaymentStatus::Other(status) => f.write_str(status),
        }
    }
}

/// A checkout session exactly as the payment provider reports it.
///
/// Read-only to this system; nothing here is trusted until it has been turned
/// into a [`VerifiedPayment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: String,
    pub payment_status: PaymentStatus,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    /// The provider's charge identifier, used as the idempotency key.
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Appointment fields taken from the paid session's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentDetails {
    pub patient_name: String,
    pub appointment_type: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub contact_number: Option<String>,
}

/// A settled payment whose metadata has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub session_id: String,
    pub payment_reference: String,
    pub amount: Money,
    pub details: AppointmentDetails,
}

impl VerifiedPayment {
    /// Validates a paid session. The error is a reason suitable for logs.
    pub fn from_session(session: &PaymentSession) -> Result<Self, String> {
        let payment_reference = session
            .payment_intent
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| "missing payment reference".to_string())?
            .to_string();

        let minor = session
            .amount_total
            .ok_or_else(|| "missing amount".to_string())?;
        let currency = session
            .currency
            .as_deref()
            .map(Currency::new)
            .unwrap_or_else(Currency::usd);
        let amount = Money::from_minor_units(MinorUnits(minor), currency)
            .ok_or_else(|| format!("negative amount {}", minor))?;

        let details = AppointmentDetails {
            patient_name: required(&session.metadata, META_PATIENT_NAME)?.to_string(),
            appointment_type: required(&session.metadata, META_APPOINTMENT_TYPE)?.to_string(),
            appointment_date: parse_date(required(&session.metadata, META_APPOINTMENT_DATE)?)?,
            appointment_time: parse_time(required(&session.metadata, META_APPOINTMENT_TIME)?)?,
            contact_number: optional(&session.metadata, META_CONTACT_NUMBER),
        };

        Ok(Self {
            session_id: session.id.clone(),
            payment_reference,
            amount,
            details,
        })
    }
}

fn required<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Result<&'a str, String> {
    metadata
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing metadata field {}", key))
}

fn optional(metadata: &HashMap<String, String>, key: &str) -> Option<String> {
    metadata
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("invalid {} '{}': {}", META_APPOINTMENT_DATE, value, e))
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| format!("invalid {} '{}': {}", META_APPOINTMENT_TIME, value, e))
}
