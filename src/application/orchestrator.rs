use super::notifier::NotificationDispatcher;
use super::store::AppointmentStore;
use super::verifier::PaymentVerifier;
use crate::config::Timeouts;
use crate::domain::appointment::ConfirmationResult;
use crate::domain::identity::AuthenticatedUser;
use crate::domain::ports::{
    AppointmentRepositoryRef, EmailProviderRef, IdentityProviderRef, PaymentProviderRef,
};
use crate::error::{ConfirmationError, ProviderError, Result};
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{Span, debug, error, field, info, instrument, warn};

/// Stages of a confirmation request. The workflow only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfirmationStage {
    Start,
    Authenticated,
    PaymentVerified,
    AppointmentPersisted,
    NotificationAttempted,
    Done,
}

impl fmt::Display for ConfirmationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfirmationStage::Start => "start",
            ConfirmationStage::Authenticated => "authenticated",
            ConfirmationStage::PaymentVerified => "payment_verified",
            ConfirmationStage::AppointmentPersisted => "appointment_persisted",
            ConfirmationStage::NotificationAttempted => "notification_attempted",
            ConfirmationStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Drives a single payment-gated confirmation from bearer token to response.
///
/// Each collaborator is called at most once per request and strictly in order:
/// identity, payment, store, email. Nothing is retried here; re-invoking the
/// whole workflow is safe because the store is idempotent on the payment
/// reference.
pub struct ConfirmationOrchestrator {
    identity: IdentityProviderRef,
    identity_timeout: Duration,
    verifier: PaymentVerifier,
    store: AppointmentStore,
    notifier: NotificationDispatcher,
}

impl ConfirmationOrchestrator {
    pub fn new(
        identity: IdentityProviderRef,
        payments: PaymentProviderRef,
        repository: AppointmentRepositoryRef,
        email: EmailProviderRef,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            identity,
            identity_timeout: timeouts.identity,
            verifier: PaymentVerifier::new(payments, timeouts.payment),
            store: AppointmentStore::new(repository, timeouts.store),
            notifier: NotificationDispatcher::new(email, timeouts.email),
        }
    }

    /// Confirms the appointment paid for by `session_id`.
    ///
    /// `bearer_token` is the caller's credential, `None` when the request carried none.
    #[instrument(
        name = "confirm_appointment",
        skip(self, bearer_token),
        fields(session_id = %session_id.trim(), stage = %ConfirmationStage::Start)
    )]
    pub async fn confirm(
        &self,
        bearer_token: Option<&str>,
        session_id: &str,
    ) -> Result<ConfirmationResult> {
        self.run(bearer_token, session_id)
            .await
            .inspect_err(|err| {
                if err.kind().is_retryable() {
                    warn!(kind = %err.kind(), error = %err, "confirmation failed");
                } else {
                    info!(kind = %err.kind(), error = %err, "confirmation rejected");
                }
            })
    }

    async fn run(&self, bearer_token: Option<&str>, session_id: &str) -> Result<ConfirmationResult> {
        let mut stage = ConfirmationStage::Start;

        let user = self.authenticate(bearer_token).await?;
        advance(&mut stage, ConfirmationStage::Authenticated);

        let payment = self.verifier.verify(session_id).await?;
        advance(&mut stage, ConfirmationStage::PaymentVerified);

        let mut details = payment.details;
        if details.contact_number.is_none() {
            details.contact_number = user.phone.clone();
        }
        let outcome = self
            .store
            .create_once(&user.id, &payment.payment_reference, details, payment.amount)
            .await?;

        let newly_created = outcome.is_created();
        let appointment = outcome.into_appointment();
        if appointment.user_id != user.id {
            warn!(
                appointment_id = %appointment.id,
                "payment already confirmed for a different user"
            );
            return Err(ConfirmationError::SessionClaimed {
                session_id: session_id.trim().to_string(),
            });
        }
        advance(&mut stage, ConfirmationStage::AppointmentPersisted);

        let email_sent = match self
            .notifier
            .send_confirmation(&user.email, &appointment)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                error!(
                    appointment_id = %appointment.id,
                    error = %err,
                    "confirmation email failed; appointment remains confirmed"
                );
                false
            }
        };
        advance(&mut stage, ConfirmationStage::NotificationAttempted);
        advance(&mut stage, ConfirmationStage::Done);

        info!(
            appointment_id = %appointment.id,
            newly_created,
            email_sent,
            "appointment confirmation complete"
        );

        Ok(ConfirmationResult {
            success: true,
            appointment_id: appointment.id,
            email_sent,
            newly_created,
        })
    }

    #[instrument(skip_all)]
    async fn authenticate(&self, bearer_token: Option<&str>) -> Result<AuthenticatedUser> {
        let token = bearer_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ConfirmationError::Authentication("missing bearer token".to_string())
            })?;

        let user = match timeout(self.identity_timeout, self.identity.get_user(token)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
        .map_err(|e| ConfirmationError::Authentication(e.to_string()))?;

        let user_id = user.id.clone();
        AuthenticatedUser::from_identity(user).ok_or_else(|| {
            ConfirmationError::Authentication(format!("user {} has no contact email", user_id))
        })
    }
}

/// Moves the workflow forward and records the stage on the request span.
fn advance(stage: &mut ConfirmationStage, to: ConfirmationStage) {
    debug_assert!(to > *stage, "stage {} cannot follow {}", to, stage);
    debug!(from = %stage, to = %to, "confirmation stage");
    Span::current().record("stage", field::display(to));
    *stage = to;
}
