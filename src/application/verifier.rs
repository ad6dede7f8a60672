use crate::domain::payment::{PaymentStatus, VerifiedPayment};
use crate::domain::ports::PaymentProviderRef;
use crate::error::{ConfirmationError, ProviderError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Confirms that a checkout session has been paid and extracts its appointment data.
pub struct PaymentVerifier {
    provider: PaymentProviderRef,
    timeout: Duration,
}

impl PaymentVerifier {
    pub fn new(provider: PaymentProviderRef, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Fetches the session and validates it.
    ///
    /// Fails with `PaymentNotCompleted` for any status other than `paid`, before
    /// the metadata is even looked at.
    #[instrument(skip(self))]
    pub async fn verify(&self, session_id: &str) -> Result<VerifiedPayment> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ConfirmationError::InvalidRequest(
                "sessionId is required".to_string(),
            ));
        }

        let session = match timeout(self.timeout, self.provider.retrieve_session(session_id)).await
        {
            Ok(Ok(session)) => session,
            Ok(Err(source)) => {
                return Err(ConfirmationError::PaymentLookup {
                    session_id: session_id.to_string(),
                    source,
                });
            }
            Err(_) => {
                return Err(ConfirmationError::PaymentLookup {
                    session_id: session_id.to_string(),
                    source: ProviderError::Timeout,
                });
            }
        };

        if session.payment_status != PaymentStatus::Paid {
            warn!(
                session_id,
                status = %session.payment_status,
                "payment session is not paid"
            );
            return Err(ConfirmationError::PaymentNotCompleted {
                session_id: session_id.to_string(),
                status: session.payment_status.to_string(),
            });
        }

        let verified = VerifiedPayment::from_session(&session).map_err(|reason| {
            ConfirmationError::InvalidPaymentData {
                session_id: session_id.to_string(),
                reason,
            }
        })?;

        debug!(
            session_id,
            payment_reference = %verified.payment_reference,
            amount = %verified.amount,
            "payment verified"
        );
        Ok(verified)
    }
}
