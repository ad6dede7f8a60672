//! HTTP API for appointment confirmation and the health assistant.

use crate::application::assistant::ConversationalAssistant;
use crate::application::orchestrator::ConfirmationOrchestrator;
use crate::domain::appointment::ConfirmationResult;
use crate::domain::chat::ChatMessage;
use crate::error::{AssistantError, ConfirmationError, ErrorKind};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Shared state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConfirmationOrchestrator>,
    pub assistant: Arc<ConversationalAssistant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAppointmentRequest {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/appointments/confirm", post(confirm_appointment))
        .route("/api/chat", post(chat))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/appointments/confirm
async fn confirm_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ConfirmAppointmentRequest>, JsonRejection>,
) -> Result<Json<ConfirmationResult>, ConfirmationError> {
    let Json(request) = payload?;
    let token = bearer_token(&headers);
    let result = state.orchestrator.confirm(token, &request.session_id).await?;
    Ok(Json(result))
}

/// POST /api/chat
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AssistantError> {
    let Json(request) = payload?;
    let response = state
        .assistant
        .chat(&request.message, &request.conversation_history)
        .await?;
    Ok(Json(ChatResponse { response }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
}

impl From<JsonRejection> for ConfirmationError {
    fn from(rejection: JsonRejection) -> Self {
        ConfirmationError::InvalidRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AssistantError {
    fn from(rejection: JsonRejection) -> Self {
        AssistantError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ConfirmationError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.public_message(),
            kind: Some(kind.as_str()),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        let status = match &self {
            AssistantError::InvalidRequest(_) | AssistantError::EmptyMessage => {
                StatusCode::BAD_REQUEST
            }
            AssistantError::Model(e) => {
                error!(error = %e, "chat request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let (message, kind) = match &self {
            AssistantError::InvalidRequest(reason) => (
                format!("Invalid request: {}", reason),
                Some(ErrorKind::InvalidRequest.as_str()),
            ),
            AssistantError::EmptyMessage => ("Message is required".to_string(), None),
            AssistantError::Model(_) => ("Failed to generate a response".to_string(), None),
        };
        let body = ErrorBody {
            error: message,
            kind,
        };
        (status, Json(body)).into_response()
    }
}
