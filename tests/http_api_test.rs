mod common;

use appointment_confirm::application::assistant::{ConversationalAssistant, DISCLAIMER};
use appointment_confirm::domain::chat::ChatMessage;
use appointment_confirm::domain::ports::{ChatModel, ProviderResult};
use appointment_confirm::interfaces::http::{AppState, router};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{Harness, OTHER_TOKEN, TOKEN, harness, paid, unpaid};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    async fn complete(&self, message: &str, history: &[ChatMessage]) -> ProviderResult<String> {
        Ok(format!("{} ({} earlier turns)", message, history.len()))
    }
}

fn app(h: &Harness) -> Router {
    router(AppState {
        orchestrator: h.orchestrator.clone(),
        assistant: Arc::new(ConversationalAssistant::new(
            Arc::new(EchoModel),
            Duration::from_secs(1),
        )),
    })
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_confirm_returns_appointment() {
    let h = harness();
    h.payments.insert(paid("sess_123", "pi_123", 15000)).await;

    let (status, body) = send(
        app(&h),
        post("/api/appointments/confirm", Some(TOKEN), json!({ "sessionId": "sess_123" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["emailSent"], json!(true));
    let stored = h.repository.find_by_reference("pi_123").await.unwrap();
    assert_eq!(body["appointmentId"], json!(stored.id.to_string()));
}

#[tokio::test]
async fn test_confirm_without_token_is_unauthorized() {
    let h = harness();
    let (status, body) = send(
        app(&h),
        post("/api/appointments/confirm", None, json!({ "sessionId": "sess_123" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], json!("authentication"));
}

#[tokio::test]
async fn test_confirm_unpaid_is_payment_required() {
    let h = harness();
    h.payments.insert(unpaid("sess_456", 15000)).await;

    let (status, body) = send(
        app(&h),
        post("/api/appointments/confirm", Some(TOKEN), json!({ "sessionId": "sess_456" })),
    )
    .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["kind"], json!("payment_not_completed"));
    assert!(h.repository.is_empty().await);
}

#[tokio::test]
async fn test_confirm_missing_session_id_is_bad_request() {
    let h = harness();
    let (status, body) = send(
        app(&h),
        post("/api/appointments/confirm", Some(TOKEN), json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], json!("invalid_request"));
    assert_eq!(h.payments.lookups(), 0);
}

#[tokio::test]
async fn test_chat_reply_carries_disclaimer() {
    let h = harness();
    let (status, body) = send(
        app(&h),
        post(
            "/api/chat",
            None,
            json!({
                "message": "What should I bring to a checkup?",
                "conversationHistory": [
                    { "role": "user", "content": "Hi" },
                    { "role": "assistant", "content": "Hello! How can I help?" }
                ]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let reply = body["response"].as_str().unwrap();
    assert!(reply.starts_with("What should I bring to a checkup? (2 earlier turns)"));
    assert!(reply.ends_with(DISCLAIMER));
}

#[tokio::test]
async fn test_chat_empty_message_is_bad_request() {
    let h = harness();
    let (status, body) = send(app(&h), post("/api/chat", None, json!({ "message": "  " }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Message is required"));
}

#[tokio::test]
async fn test_health() {
    let h = harness();
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(&h), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}

fn raw_post(uri: &str, body: &'static str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_confirm_malformed_body_is_json_bad_request() {
    let h = harness();
    let (status, body) = send(app(&h), raw_post("/api/appointments/confirm", "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], json!("invalid_request"));
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request"));
    assert_eq!(h.payments.lookups(), 0);
}

#[tokio::test]
async fn test_confirm_without_json_content_type_is_json_bad_request() {
    let h = harness();
    let request = Request::post("/api/appointments/confirm")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::from(r#"{"sessionId":"sess_123"}"#))
        .unwrap();
    let (status, body) = send(app(&h), request).await;

    assert!(status.is_client_error());
    assert_eq!(body["kind"], json!("invalid_request"));
}

#[tokio::test]
async fn test_chat_malformed_body_is_json_bad_request() {
    let h = harness();
    let (status, body) = send(app(&h), raw_post("/api/chat", r#"{"message": 42}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], json!("invalid_request"));
}

#[tokio::test]
async fn test_confirm_other_users_payment_is_forbidden() {
    let h = harness();
    h.payments.insert(paid("sess_a", "pi_a", 15000)).await;

    let (status, _) = send(
        app(&h),
        post("/api/appointments/confirm", Some(TOKEN), json!({ "sessionId": "sess_a" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app(&h),
        post("/api/appointments/confirm", Some(OTHER_TOKEN), json!({ "sessionId": "sess_a" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], json!("forbidden"));
    assert!(body.get("appointmentId").is_none());
    assert_eq!(h.outbox.sent().await.len(), 1);
}
