//! OpenAI-compatible chat completions client.

use super::http_client::{check_status, trim_base};
use crate::config::ChatConfig;
use crate::domain::chat::{ChatMessage, ChatRole};
use crate::domain::ports::{ChatModel, ProviderResult};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are a friendly health assistant for a medical clinic. \
Give general, evidence-based health information in plain language, help patients \
understand which type of appointment may suit them, and never present a diagnosis. \
Encourage urgent care for emergencies.";

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiChatModel {
    api_base: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(api_key: &str, config: &ChatConfig, client: reqwest::Client) -> Self {
        Self {
            api_base: trim_base(&config.api_base),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            client,
        }
    }
}

fn build_request<'a>(model: &'a str, message: &'a str, history: &'a [ChatMessage]) -> CompletionRequest<'a> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(CompletionMessage {
        role: "system",
        content: SYSTEM_PROMPT,
    });
    messages.extend(history.iter().map(|m| CompletionMessage {
        role: match m.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        },
        content: &m.content,
    }));
    messages.push(CompletionMessage {
        role: "user",
        content: message,
    });
    CompletionRequest { model, messages }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, message: &str, history: &[ChatMessage]) -> ProviderResult<String> {
        let request = build_request(&self.model, message, history);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let completion: CompletionResponse = check_status(response).await?.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::Decode("completion contained no text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wraps_history_between_system_and_user() {
        let history = vec![
            ChatMessage::user("I have a headache"),
            ChatMessage::assistant("How long have you had it?"),
        ];
        let request = build_request("gpt-4o-mini", "Two days", &history);
        let roles: Vec<_> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(request.messages[3].content, "Two days");
    }

    #[test]
    fn test_response_parsing() {
        let payload = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Rest and hydrate."}}]}"#;
        let response: CompletionResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("Rest and hydrate.")
        );
    }
}
