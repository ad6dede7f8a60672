//! Stripe Checkout client.

use super::http_client::{check_status, trim_base};
use crate::config::StripeConfig;
use crate::domain::payment::PaymentSession;
use crate::domain::ports::{PaymentProvider, ProviderResult};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

pub struct StripePaymentProvider {
    api_base: String,
    secret_key: String,
    client: reqwest::Client,
}

impl StripePaymentProvider {
    pub fn new(config: &StripeConfig, client: reqwest::Client) -> Self {
        Self {
            api_base: trim_base(&config.api_base),
            secret_key: config.secret_key.clone(),
            client,
        }
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentProvider {
    async fn retrieve_session(&self, session_id: &str) -> ProviderResult<PaymentSession> {
        let url = session_url(&self.api_base, session_id)?;
        debug!(session_id, "retrieving checkout session");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// The session id is appended as a single percent-encoded path segment.
fn session_url(api_base: &str, session_id: &str) -> ProviderResult<Url> {
    let mut url = Url::parse(api_base)
        .map_err(|e| ProviderError::Transport(format!("invalid Stripe API base: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| ProviderError::Transport("Stripe API base cannot be a base URL".to_string()))?
        .pop_if_empty()
        .extend(["v1", "checkout", "sessions", session_id]);
    Ok(url)
}
