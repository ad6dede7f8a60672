use super::appointment::{InsertOutcome, NewAppointment};
use super::chat::ChatMessage;
use super::identity::IdentityUser;
use super::payment::PaymentSession;
use crate::error::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token to its user. Invalid tokens yield `ProviderError::Unauthorized`.
    async fn get_user(&self, token: &str) -> ProviderResult<IdentityUser>;
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn retrieve_session(&self, session_id: &str) -> ProviderResult<PaymentSession>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Inserts the appointment unless one already exists for its payment reference,
    /// in which case the stored appointment is returned untouched.
    ///
    /// Implementations must make the check and the insert a single atomic step
    /// at the storage level.
    async fn insert_or_fetch(&self, appointment: NewAppointment) -> ProviderResult<InsertOutcome>;
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Returns the provider's message id.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> ProviderResult<String>;
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, message: &str, history: &[ChatMessage]) -> ProviderResult<String>;
}

pub type IdentityProviderRef = Arc<dyn IdentityProvider>;
pub type PaymentProviderRef = Arc<dyn PaymentProvider>;
pub type AppointmentRepositoryRef = Arc<dyn AppointmentRepository>;
pub type EmailProviderRef = Arc<dyn EmailProvider>;
pub type ChatModelRef = Arc<dyn ChatModel>;
