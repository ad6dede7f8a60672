//! Resend transactional email client.

use super::http_client::{check_status, trim_base};
use crate::config::EmailConfig;
use crate::domain::ports::{EmailProvider, ProviderResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.resend.com";

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

pub struct ResendEmailProvider {
    api_base: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl ResendEmailProvider {
    pub fn new(api_key: &str, config: &EmailConfig, client: reqwest::Client) -> Self {
        Self {
            api_base: trim_base(&config.api_base),
            api_key: api_key.to_string(),
            from: config.from.clone(),
            client,
        }
    }
}

#[async_trait]
impl EmailProvider for ResendEmailProvider {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> ProviderResult<String> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject,
            html: html_body,
        };
        let response = self
            .client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let sent: SendEmailResponse = check_status(response).await?.json().await?;
        Ok(sent.id)
    }
}
