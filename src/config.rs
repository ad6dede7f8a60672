//! Configuration for the confirmation service

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bounds for each external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Identity provider lookup
    pub identity: Duration,
    /// Payment session retrieval
    pub payment: Duration,
    /// Appointment insert-or-fetch
    pub store: Duration,
    /// Confirmation email submission
    pub email: Duration,
    /// Chat model completion
    pub chat: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            identity: Duration::from_secs(5),
            payment: Duration::from_secs(10),
            store: Duration::from_secs(10),
            email: Duration::from_secs(10),
            chat: Duration::from_secs(30),
        }
    }
}

impl Timeouts {
    /// Same bound for every stage; mostly useful in tests.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            identity: timeout,
            payment: timeout,
            store: timeout,
            email: timeout,
            chat: timeout,
        }
    }
}

/// Payment provider (Stripe) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
}

/// Identity provider and data store (Supabase) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    /// Required only when appointments are stored in Supabase.
    pub service_role_key: Option<String>,
}

/// Email provider (Resend) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Without a key, messages are kept in an in-process outbox.
    pub resend_api_key: Option<String>,
    pub api_base: String,
    pub from: String,
}

/// OpenAI-compatible chat model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub stripe: StripeConfig,
    pub supabase: SupabaseConfig,
    pub email: EmailConfig,
    pub chat: ChatConfig,
    pub timeouts: Timeouts,
}

/// Builder for Timeouts
pub struct TimeoutsBuilder {
    timeouts: Timeouts,
}

impl TimeoutsBuilder {
    pub fn new() -> Self {
        Self {
            timeouts: Timeouts::default(),
        }
    }

    pub fn identity(mut self, timeout: Duration) -> Self {
        self.timeouts.identity = timeout;
        self
    }

    pub fn payment(mut self, timeout: Duration) -> Self {
        self.timeouts.payment = timeout;
        self
    }

    pub fn store(mut self, timeout: Duration) -> Self {
        self.timeouts.store = timeout;
        self
    }

    pub fn email(mut self, timeout: Duration) -> Self {
        self.timeouts.email = timeout;
        self
    }

    pub fn chat(mut self, timeout: Duration) -> Self {
        self.timeouts.chat = timeout;
        self
    }

    pub fn build(self) -> Timeouts {
        self.timeouts
    }
}

impl Default for TimeoutsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
