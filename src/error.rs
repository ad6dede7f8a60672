use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T, E = ConfirmationError> = std::result::Result<T, E>;

/// Failures reported by the external collaborators behind the ports.
///
/// These carry provider details meant for logs. They are translated into a
/// [`ConfirmationError`] at the stage boundary and never sent to callers verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode provider response: {0}")]
    Decode(String),
    #[error("credential rejected")]
    Unauthorized,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("timed out")]
    Timeout,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for ProviderError {
    fn from(err: rocksdb::Error) -> Self {
        ProviderError::Storage(err.to_string())
    }
}

/// Machine-checkable classification of a confirmation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    Authentication,
    Forbidden,
    PaymentLookup,
    PaymentNotCompleted,
    Persistence,
    Notification,
}

impl ErrorKind {
    /// Whether re-invoking the workflow with the same input can succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::PaymentLookup | ErrorKind::Persistence | ErrorKind::Notification
        )
    }

    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidRequest => 400,
            ErrorKind::Authentication => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::PaymentNotCompleted => 402,
            ErrorKind::PaymentLookup | ErrorKind::Persistence | ErrorKind::Notification => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::PaymentLookup => "payment_lookup",
            ErrorKind::PaymentNotCompleted => "payment_not_completed",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Notification => "notification",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way a confirmation request can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfirmationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("payment for session {session_id} was confirmed by another user")]
    SessionClaimed { session_id: String },
    #[error("payment lookup failed for session {session_id}: {source}")]
    PaymentLookup {
        session_id: String,
        #[source]
        source: ProviderError,
    },
    #[error("payment for session {session_id} is not completed (status: {status})")]
    PaymentNotCompleted { session_id: String, status: String },
    #[error("payment session {session_id} carries invalid data: {reason}")]
    InvalidPaymentData { session_id: String, reason: String },
    #[error("failed to persist appointment for payment {payment_reference}: {source}")]
    Persistence {
        payment_reference: String,
        #[source]
        source: ProviderError,
    },
    #[error("failed to send confirmation for appointment {appointment_id}: {source}")]
    Notification {
        appointment_id: String,
        #[source]
        source: ProviderError,
    },
}

impl ConfirmationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfirmationError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ConfirmationError::Authentication(_) => ErrorKind::Authentication,
            ConfirmationError::SessionClaimed { .. } => ErrorKind::Forbidden,
            ConfirmationError::PaymentLookup { .. } => ErrorKind::PaymentLookup,
            ConfirmationError::PaymentNotCompleted { .. } => ErrorKind::PaymentNotCompleted,
            // A session whose metadata cannot produce a valid record is a
            // persistence-class failure: nothing is written.
            ConfirmationError::InvalidPaymentData { .. } => ErrorKind::Persistence,
            ConfirmationError::Persistence { .. } => ErrorKind::Persistence,
            ConfirmationError::Notification { .. } => ErrorKind::Notification,
        }
    }

    /// Human-readable message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self {
            ConfirmationError::InvalidRequest(reason) => format!("Invalid request: {}", reason),
            ConfirmationError::Authentication(_) => "Unauthorized".to_string(),
            ConfirmationError::SessionClaimed { .. } => {
                "This payment belongs to another account".to_string()
            }
            ConfirmationError::PaymentLookup { .. } => {
                "Unable to verify payment at this time, please try again".to_string()
            }
            ConfirmationError::PaymentNotCompleted { .. } => {
                "Payment has not been completed".to_string()
            }
            ConfirmationError::InvalidPaymentData { .. } => {
                "Payment details are incomplete, appointment could not be recorded".to_string()
            }
            ConfirmationError::Persistence { .. } => {
                "Unable to record appointment at this time, please try again".to_string()
            }
            ConfirmationError::Notification { .. } => {
                "Confirmation email could not be sent".to_string()
            }
        }
    }
}

/// Failures of the conversational assistant endpoint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssistantError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("chat model failed: {0}")]
    Model(#[from] ProviderError),
}

/// Failures while building provider clients from configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_per_kind() {
        assert_eq!(ErrorKind::InvalidRequest.status_code(), 400);
        assert_eq!(ErrorKind::Authentication.status_code(), 401);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
        assert_eq!(ErrorKind::PaymentNotCompleted.status_code(), 402);
        assert_eq!(ErrorKind::PaymentLookup.status_code(), 500);
        assert_eq!(ErrorKind::Persistence.status_code(), 500);
    }

    #[test]
    fn test_retry_classification() {
        assert!(!ErrorKind::Authentication.is_retryable());
        assert!(!ErrorKind::Forbidden.is_retryable());
        assert!(!ErrorKind::PaymentNotCompleted.is_retryable());
        assert!(ErrorKind::PaymentLookup.is_retryable());
        assert!(ErrorKind::Persistence.is_retryable());
    }

    #[test]
    fn test_invalid_payment_data_is_persistence_kind() {
        let err = ConfirmationError::InvalidPaymentData {
            session_id: "sess_1".to_string(),
            reason: "missing appointment_date".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_public_message_hides_provider_details() {
        let err = ConfirmationError::PaymentLookup {
            session_id: "sess_1".to_string(),
            source: ProviderError::Status {
                status: 503,
                body: "upstream secret detail".to_string(),
            },
        };
        assert!(!err.public_message().contains("secret"));
        assert!(err.to_string().contains("secret"));
    }
}
