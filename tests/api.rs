//! End-to-end API tests over the full router with in-memory fakes for
//! the hosted collaborators.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::connect_info::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tower::ServiceExt;

use margin_notes_server::chat::framing;
use margin_notes_server::chat::{
    CallerIdentity, CompletionSource, DeltaStream, IdentityResolver, PromptMessage, ScoredChunk,
    SemanticIndex,
};
use margin_notes_server::config::Config;
use margin_notes_server::db::{self, FileRepository, MessageRepository, UserRepository};
use margin_notes_server::error::Result as AppResult;
use margin_notes_server::routes;
use margin_notes_server::state::AppState;
use margin_notes_server::webhook::signature;

const WEBHOOK_SECRET: &str = "whsec_integration";
const ALLOWED_IP: &str = "34.194.127.46";

struct FakeResolver;

#[async_trait]
impl IdentityResolver for FakeResolver {
    async fn resolve(&self, credential: &str) -> AppResult<Option<CallerIdentity>> {
        Ok(match credential {
            "token-owner" => Some(CallerIdentity {
                user_id: "owner".to_string(),
                email: "owner@example.com".to_string(),
            }),
            "token-other" => Some(CallerIdentity {
                user_id: "other".to_string(),
                email: "other@example.com".to_string(),
            }),
            _ => None,
        })
    }
}

struct FakeIndex;

#[async_trait]
impl SemanticIndex for FakeIndex {
    async fn similarity_search(
        &self,
        _namespace: &str,
        _query: &str,
        k: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        Ok((0..k)
            .map(|i| ScoredChunk {
                content: format!("Clause {}: the term is 24 months.", i + 1),
                score: 1.0 - i as f32 * 0.05,
            })
            .collect())
    }
}

struct FakeCompletion {
    deltas: Vec<&'static str>,
}

#[async_trait]
impl CompletionSource for FakeCompletion {
    async fn stream_completion(&self, _messages: Vec<PromptMessage>) -> AppResult<DeltaStream> {
        let events: Vec<AppResult<String>> =
            self.deltas.iter().map(|d| Ok(d.to_string())).collect();
        Ok(Box::pin(tokio_stream::iter(events)))
    }
}

async fn test_app(deltas: Vec<&'static str>, with_secret: bool) -> (Router, SqlitePool) {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    db::init_schema(&pool).await.unwrap();

    let mut config = Config::default();
    config.webhook.secret = with_secret.then(|| WEBHOOK_SECRET.to_string());

    let state = AppState::new(
        config,
        pool.clone(),
        Arc::new(FakeResolver),
        Arc::new(FakeIndex),
        Arc::new(FakeCompletion { deltas }),
    );

    (routes::app(state), pool)
}

fn chat_request(token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn webhook_request(body: &[u8], signature_header: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/paddle")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ALLOWED_IP)
        .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    if let Some(sig) = signature_header {
        builder = builder.header("Paddle-Signature", sig);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

#[tokio::test]
async fn test_chat_requires_authentication() {
    let (app, _pool) = test_app(vec!["hi"], true).await;

    let response = app
        .oneshot(chat_request(None, r#"{"fileId":"f1","message":"hi"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chat_rejects_invalid_json() {
    let (app, _pool) = test_app(vec!["hi"], true).await;

    let response = app
        .oneshot(chat_request(Some("token-owner"), "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_hides_foreign_files() {
    let (app, pool) = test_app(vec!["hi"], true).await;

    let file_id = FileRepository::new(&pool)
        .create("owner", "contract.pdf")
        .await
        .unwrap();

    let body = format!(r#"{{"fileId":"{}","message":"hi"}}"#, file_id);
    let response = app
        .oneshot(chat_request(Some("token-other"), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Nothing was written for the foreign caller
    let messages = MessageRepository::new(pool.clone())
        .list_for_file(&file_id)
        .await
        .unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_chat_turn_streams_and_persists() {
    let deltas = vec!["The contract ", "term is ", "24 months."];
    let (app, pool) = test_app(deltas, true).await;

    let file_id = FileRepository::new(&pool)
        .create("owner", "contract.pdf")
        .await
        .unwrap();

    // Two prior messages in the history window
    let repo = MessageRepository::new(pool.clone());
    repo.create(&file_id, "owner", "What does clause 2 say?", true)
        .await
        .unwrap();
    repo.create(&file_id, "owner", "Clause 2 covers renewals.", false)
        .await
        .unwrap();

    let body = format!(
        r#"{{"fileId":"{}","message":"What is the contract term?"}}"#,
        file_id
    );
    let response = app
        .oneshot(chat_request(Some("token-owner"), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The body is framed deltas; reassembly strips the framing
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let answer = framing::reassemble(&bytes).unwrap();
    assert_eq!(answer, "The contract term is 24 months.");

    // Exactly two new messages, question strictly before answer
    let messages = repo.list_for_file(&file_id).await.unwrap();
    assert_eq!(messages.len(), 4);

    let question = &messages[2];
    let persisted_answer = &messages[3];
    assert!(question.is_user_message);
    assert_eq!(question.text, "What is the contract term?");
    assert!(!persisted_answer.is_user_message);
    assert_eq!(persisted_answer.text, answer);
    assert!(question.created_at < persisted_answer.created_at);
}

#[tokio::test]
async fn test_webhook_accepts_signed_activation() {
    let (app, pool) = test_app(vec![], true).await;

    UserRepository::new(&pool)
        .create("user-1", "a@b.c")
        .await
        .unwrap();

    let ends_at = Utc::now() + Duration::days(30);
    let body = serde_json::json!({
        "event_type": "subscription.activated",
        "data": {
            "id": "sub_123",
            "customer_id": "ctm_456",
            "items": [{"price": {"id": "pri_01j2fjpg9wkf1b0qydst0mcn7m"}}],
            "current_billing_period": {"ends_at": ends_at.to_rfc3339()},
            "custom_data": {"user_id": "user-1"}
        }
    })
    .to_string();

    let ts = "1724764800";
    let sig = format!(
        "ts={};h1={}",
        ts,
        signature::sign(body.as_bytes(), ts, WEBHOOK_SECRET)
    );

    let response = app
        .oneshot(webhook_request(body.as_bytes(), Some(sig)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = UserRepository::new(&pool)
        .get("user-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.paddle_subscription_id.as_deref(), Some("sub_123"));
    assert_eq!(
        user.current_period_end().unwrap().timestamp(),
        ends_at.timestamp()
    );
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let (app, _pool) = test_app(vec![], true).await;

    let body = br#"{"event_type":"subscription.activated","data":{"id":"sub_1"}}"#;
    let sig = format!(
        "ts=1;h1={}",
        signature::sign(b"different body", "1", WEBHOOK_SECRET)
    );

    let response = app
        .oneshot(webhook_request(body, Some(sig)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_fails_closed_without_secret() {
    let (app, _pool) = test_app(vec![], false).await;

    let body = br#"{"event_type":"subscription.activated","data":{"id":"sub_1"}}"#;
    let response = app
        .oneshot(webhook_request(body, Some("ts=1;h1=00".to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_webhook_rejects_other_methods() {
    let (app, _pool) = test_app(vec![], true).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/webhooks/paddle")
        .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
