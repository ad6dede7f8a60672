use super::money::{Currency, Money};
use super::payment::{AppointmentDetails, PaymentStatus};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
}

/// A booked appointment, created once per payment reference.
///
/// Field names match the `appointments` table so the same serde shape is used
/// by every storage backend.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: String,
    pub patient_name: String,
    pub contact_number: Option<String>,
    pub appointment_type: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    /// Unique across all appointments.
    pub payment_reference: String,
    pub total_amount: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn total(&self) -> Money {
        Money {
            amount: self.total_amount,
            currency: self.currency.clone(),
        }
    }

    /// Restores the currency's minor-unit scale on `total_amount`.
    ///
    /// Backends that hand the amount back as a JSON number drop trailing zeros.
    pub fn with_currency_scale(mut self) -> Self {
        self.total_amount.rescale(self.currency.exponent());
        self
    }
}

/// Everything needed to insert an appointment, minus the generated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub user_id: String,
    pub payment_reference: String,
    pub details: AppointmentDetails,
    pub amount: Money,
}

impl NewAppointment {
    pub fn into_appointment(self) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            patient_name: self.details.patient_name,
            contact_number: self.details.contact_number,
            appointment_type: self.details.appointment_type,
            appointment_date: self.details.appointment_date,
            appointment_time: self.details.appointment_time,
            status: AppointmentStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            payment_reference: self.payment_reference,
            total_amount: self.amount.amount,
            currency: self.amount.currency,
            created_at: Utc::now(),
        }
    }
}

/// Result of an atomic insert-or-fetch keyed by payment reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(Appointment),
    Existing(Appointment),
}

impl InsertOutcome {
    pub fn appointment(&self) -> &Appointment {
        match self {
            InsertOutcome::Created(a) | InsertOutcome::Existing(a) => a,
        }
    }

    pub fn into_appointment(self) -> Appointment {
        match self {
            InsertOutcome::Created(a) | InsertOutcome::Existing(a) => a,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }
}

/// Transient outcome handed back to the caller; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub success: bool,
    pub appointment_id: Uuid,
    pub email_sent: bool,
    #[serde(skip)]
    pub newly_created: bool,
}
