use crate::domain::chat::ChatMessage;
use crate::domain::ports::ChatModelRef;
use crate::error::{AssistantError, ProviderError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

pub const DISCLAIMER: &str = "Please note: this information is general guidance, not a medical \
diagnosis. Always consult a healthcare professional about your specific situation.";

/// Lowercase phrase whose presence means the reply already carries the disclaimer.
const DISCLAIMER_MARKER: &str = "consult a healthcare professional";

/// Turns kept from the conversation history.
pub const MAX_HISTORY: usize = 20;

/// Conversational health assistant.
///
/// Replies always end up carrying the professional-consultation disclaimer.
pub struct ConversationalAssistant {
    model: ChatModelRef,
    timeout: Duration,
}

impl ConversationalAssistant {
    pub fn new(model: ChatModelRef, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn chat(&self, message: &str, history: &[ChatMessage]) -> Result<String, AssistantError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        let recent = &history[history.len().saturating_sub(MAX_HISTORY)..];
        debug!(history = recent.len(), "forwarding chat message");

        let reply = match timeout(self.timeout, self.model.complete(message, recent)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
        .inspect_err(|e| warn!(error = %e, "chat model failed"))?;

        Ok(with_disclaimer(reply))
    }
}

/// Appends the disclaimer unless the text already contains it.
pub fn with_disclaimer(reply: String) -> String {
    if reply.to_lowercase().contains(DISCLAIMER_MARKER) {
        return reply;
    }
    let trimmed = reply.trim_end();
    if trimmed.is_empty() {
        DISCLAIMER.to_string()
    } else {
        format!("{}\n\n{}", trimmed, DISCLAIMER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ChatModel, ProviderResult};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: ProviderResult<String>,
        seen_history: Mutex<usize>,
    }

    impl ScriptedModel {
        fn replying(reply: ProviderResult<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen_history: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _message: &str, history: &[ChatMessage]) -> ProviderResult<String> {
            *self.seen_history.lock().unwrap() = history.len();
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn test_disclaimer_appended() {
        let model = ScriptedModel::replying(Ok("Drink plenty of water.".to_string()));
        let assistant = ConversationalAssistant::new(model, Duration::from_secs(1));

        let reply = assistant.chat("I feel dizzy", &[]).await.unwrap();
        assert!(reply.starts_with("Drink plenty of water."));
        assert!(reply.ends_with(DISCLAIMER));
    }

    #[tokio::test]
    async fn test_existing_disclaimer_not_duplicated() {
        let text = format!("Rest well.\n\n{}", DISCLAIMER);
        let model = ScriptedModel::replying(Ok(text.clone()));
        let assistant = ConversationalAssistant::new(model, Duration::from_secs(1));

        let reply = assistant.chat("Any tips?", &[]).await.unwrap();
        assert_eq!(reply, text);
        assert_eq!(reply.matches(DISCLAIMER).count(), 1);
    }

    #[tokio::test]
    async fn test_marker_match_is_case_insensitive() {
        assert_eq!(
            with_disclaimer("You should CONSULT A HEALTHCARE PROFESSIONAL soon.".to_string()),
            "You should CONSULT A HEALTHCARE PROFESSIONAL soon."
        );
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let model = ScriptedModel::replying(Ok("unused".to_string()));
        let assistant = ConversationalAssistant::new(model, Duration::from_secs(1));
        assert_eq!(
            assistant.chat("   ", &[]).await.unwrap_err(),
            AssistantError::EmptyMessage
        );
    }

    #[tokio::test]
    async fn test_model_failure_surfaces() {
        let model = ScriptedModel::replying(Err(ProviderError::Status {
            status: 500,
            body: "boom".to_string(),
        }));
        let assistant = ConversationalAssistant::new(model, Duration::from_secs(1));
        assert!(matches!(
            assistant.chat("hello", &[]).await,
            Err(AssistantError::Model(_))
        ));
    }

    #[tokio::test]
    async fn test_history_truncated() {
        let model = ScriptedModel::replying(Ok("ok".to_string()));
        let assistant = ConversationalAssistant::new(model.clone(), Duration::from_secs(1));
        let history: Vec<_> = (0..50).map(|i| ChatMessage::user(format!("turn {}", i))).collect();

        assistant.chat("latest", &history).await.unwrap();
        assert_eq!(*model.seen_history.lock().unwrap(), MAX_HISTORY);
    }
}
