use crate::domain::appointment::{Appointment, InsertOutcome, NewAppointment};
use crate::domain::identity::IdentityUser;
use crate::domain::payment::{
    META_APPOINTMENT_DATE, META_APPOINTMENT_TIME, META_APPOINTMENT_TYPE, META_PATIENT_NAME,
    PaymentSession, PaymentStatus,
};
use crate::domain::ports::{
    AppointmentRepository, EmailProvider, IdentityProvider, PaymentProvider, ProviderResult,
};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct AppointmentTable {
    by_id: HashMap<Uuid, Appointment>,
    by_reference: HashMap<String, Uuid>,
}

/// A thread-safe in-memory appointment table.
///
/// Both indexes live behind one `RwLock`, so the uniqueness check and the insert
/// happen under a single write guard. Only suitable for a single process.
#[derive(Default, Clone)]
pub struct InMemoryAppointmentRepository {
    table: Arc<RwLock<AppointmentTable>>,
    insert_attempts: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl InMemoryAppointmentRepository {
    /// Creates a new, empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every insert before it touches the table.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn get(&self, id: Uuid) -> Option<Appointment> {
        self.table.read().await.by_id.get(&id).cloned()
    }

    pub async fn find_by_reference(&self, payment_reference: &str) -> Option<Appointment> {
        let table = self.table.read().await;
        table
            .by_reference
            .get(payment_reference)
            .and_then(|id| table.by_id.get(id))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of `insert_or_fetch` calls received, successful or not.
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    /// Simulates a storage outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert_or_fetch(&self, appointment: NewAppointment) -> ProviderResult<InsertOutcome> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Storage("storage unavailable".to_string()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        // Let racing callers interleave before contending on the lock.
        tokio::task::yield_now().await;

        let mut table = self.table.write().await;
        if let Some(existing) = table
            .by_reference
            .get(&appointment.payment_reference)
            .and_then(|id| table.by_id.get(id))
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        let appointment = appointment.into_appointment();
        table
            .by_reference
            .insert(appointment.payment_reference.clone(), appointment.id);
        table.by_id.insert(appointment.id, appointment.clone());
        Ok(InsertOutcome::Created(appointment))
    }
}

/// Payment provider backed by a map of sessions.
#[derive(Default, Clone)]
pub struct InMemoryPaymentProvider {
    sessions: Arc<RwLock<HashMap<String, PaymentSession>>>,
    lookups: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl InMemoryPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every lookup, for exercising timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn insert(&self, session: PaymentSession) {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// A paid USD session for a general checkup on 2025-03-10 at 10:00.
    pub fn paid_session(session_id: &str, payment_reference: &str, amount_total: i64) -> PaymentSession {
        let metadata = [
            (META_PATIENT_NAME, "Jane Doe"),
            (META_APPOINTMENT_TYPE, "General Checkup"),
            (META_APPOINTMENT_DATE, "2025-03-10"),
            (META_APPOINTMENT_TIME, "10:00"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        PaymentSession {
            id: session_id.to_string(),
            payment_status: PaymentStatus::Paid,
            amount_total: Some(amount_total),
            currency: Some("usd".to_string()),
            payment_intent: Some(payment_reference.to_string()),
            metadata,
        }
    }
}

#[async_trait]
impl PaymentProvider for InMemoryPaymentProvider {
    async fn retrieve_session(&self, session_id: &str) -> ProviderResult<PaymentSession> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: 404,
                body: format!("No such checkout.session: {}", session_id),
            })
    }
}

/// Identity provider with a fixed token table.
#[derive(Default, Clone)]
pub struct StaticIdentityProvider {
    users: HashMap<String, IdentityUser>,
    delay: Option<Duration>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, user: IdentityUser) -> Self {
        self.users.insert(token.to_string(), user);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn get_user(&self, token: &str) -> ProviderResult<IdentityUser> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.users
            .get(token)
            .cloned()
            .ok_or(ProviderError::Unauthorized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub message_id: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Email provider that keeps messages in process instead of delivering them.
#[derive(Default, Clone)]
pub struct OutboxEmailProvider {
    sent: Arc<RwLock<Vec<SentEmail>>>,
    failing: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl OutboxEmailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds every send for `delay` before it is accepted.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.read().await.clone()
    }

    /// Makes every subsequent send fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmailProvider for OutboxEmailProvider {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> ProviderResult<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                status: 503,
                body: "email provider unavailable".to_string(),
            });
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let message_id = format!("outbox-{}", Uuid::new_v4());
        info!(to, subject, message_id = %message_id, "email captured in outbox");
        self.sent.write().await.push(SentEmail {
            message_id: message_id.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(message_id)
    }
}
