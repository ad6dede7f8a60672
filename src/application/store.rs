use crate::domain::appointment::{InsertOutcome, NewAppointment};
use crate::domain::money::Money;
use crate::domain::payment::AppointmentDetails;
use crate::domain::ports::AppointmentRepositoryRef;
use crate::error::{ConfirmationError, ProviderError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument};

/// Creates at most one appointment per payment reference.
///
/// Uniqueness is delegated to the repository, which enforces it at the storage
/// level; this type adds the timeout and the error mapping.
pub struct AppointmentStore {
    repository: AppointmentRepositoryRef,
    timeout: Duration,
}

impl AppointmentStore {
    pub fn new(repository: AppointmentRepositoryRef, timeout: Duration) -> Self {
        Self {
            repository,
            timeout,
        }
    }

    /// Inserts the appointment, or returns the one already stored for `payment_reference`.
    #[instrument(skip(self, details, amount))]
    pub async fn create_once(
        &self,
        user_id: &str,
        payment_reference: &str,
        details: AppointmentDetails,
        amount: Money,
    ) -> Result<InsertOutcome> {
        let new_appointment = NewAppointment {
            user_id: user_id.to_string(),
            payment_reference: payment_reference.to_string(),
            details,
            amount,
        };

        let outcome = match timeout(
            self.timeout,
            self.repository.insert_or_fetch(new_appointment),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
        .map_err(|source| ConfirmationError::Persistence {
            payment_reference: payment_reference.to_string(),
            source,
        })?;

        match &outcome {
            InsertOutcome::Created(a) => {
                info!(appointment_id = %a.id, payment_reference, "appointment created")
            }
            InsertOutcome::Existing(a) => {
                info!(appointment_id = %a.id, payment_reference, "appointment already recorded for payment")
            }
        }
        Ok(outcome)
    }
}
