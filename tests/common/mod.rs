#![allow(dead_code)]

use appointment_confirm::application::orchestrator::ConfirmationOrchestrator;
use appointment_confirm::config::Timeouts;
use appointment_confirm::domain::identity::IdentityUser;
use appointment_confirm::domain::payment::{PaymentSession, PaymentStatus};
use appointment_confirm::domain::ports::AppointmentRepositoryRef;
use appointment_confirm::infrastructure::in_memory::{
    InMemoryAppointmentRepository, InMemoryPaymentProvider, OutboxEmailProvider,
    StaticIdentityProvider,
};
use std::sync::Arc;
use std::time::Duration;

pub const TOKEN: &str = "patient-token";
pub const USER_ID: &str = "7b0c3c52-6a1e-4f0e-9a8e-2f1d3c4b5a69";
pub const USER_EMAIL: &str = "jane.doe@example.com";
pub const OTHER_TOKEN: &str = "other-patient-token";
pub const OTHER_EMAIL: &str = "john.roe@example.com";

pub struct Harness {
    pub payments: InMemoryPaymentProvider,
    pub repository: InMemoryAppointmentRepository,
    pub outbox: OutboxEmailProvider,
    pub orchestrator: Arc<ConfirmationOrchestrator>,
}

pub fn identity() -> StaticIdentityProvider {
    StaticIdentityProvider::new()
        .with_user(
            TOKEN,
            IdentityUser {
                id: USER_ID.to_string(),
                email: Some(USER_EMAIL.to_string()),
                phone: None,
            },
        )
        .with_user(
            OTHER_TOKEN,
            IdentityUser {
                id: "1f9d4c7e-2b83-4a61-9c0d-5e7a8b6f3d20".to_string(),
                email: Some(OTHER_EMAIL.to_string()),
                phone: None,
            },
        )
}

/// Orchestrator wired to in-memory collaborators.
pub fn harness() -> Harness {
    let repository = InMemoryAppointmentRepository::new();
    let (payments, outbox, orchestrator) = wire(Arc::new(repository.clone()));
    Harness {
        payments,
        repository,
        outbox,
        orchestrator,
    }
}

/// Orchestrator with in-memory providers around the given repository.
pub fn wire(
    repository: AppointmentRepositoryRef,
) -> (InMemoryPaymentProvider, OutboxEmailProvider, Arc<ConfirmationOrchestrator>) {
    let payments = InMemoryPaymentProvider::new();
    let outbox = OutboxEmailProvider::new();
    let orchestrator = Arc::new(ConfirmationOrchestrator::new(
        Arc::new(identity()),
        Arc::new(payments.clone()),
        repository,
        Arc::new(outbox.clone()),
        Timeouts::uniform(Duration::from_secs(2)),
    ));
    (payments, outbox, orchestrator)
}

pub fn paid(session_id: &str, payment_reference: &str, amount_total: i64) -> PaymentSession {
    InMemoryPaymentProvider::paid_session(session_id, payment_reference, amount_total)
}

pub fn unpaid(session_id: &str, amount_total: i64) -> PaymentSession {
    let mut session = InMemoryPaymentProvider::paid_session(session_id, "", amount_total);
    session.payment_status = PaymentStatus::Unpaid;
    session.payment_intent = None;
    session
}
