//! Payment webhook endpoint
//!
//! The body is taken as raw bytes and verified verbatim before any
//! parsing: signature verification over a re-serialized body is not
//! bit-equivalent and would reject valid deliveries.

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    routing::post,
    Router,
};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::webhook::{self, WebhookEvent};

pub fn router() -> Router<AppState> {
    // POST only; axum answers 405 for anything else on this path
    Router::new().route("/paddle", post(receive_event))
}

/// Delivery source address: first hop of X-Forwarded-For when present,
/// otherwise the peer address
fn source_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_else(|| peer.ip())
}

async fn receive_event(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    // Fail closed when the shared secret is absent
    let secret = state
        .config()
        .webhook
        .secret
        .as_deref()
        .ok_or_else(|| AppError::Configuration("PADDLE_WEBHOOK_KEY is not set".to_string()))?;

    let signature = headers
        .get("Paddle-Signature")
        .and_then(|v| v.to_str().ok());

    webhook::verify(
        &body,
        signature,
        source_ip(&headers, peer),
        &state.config().webhook.allowed_ips,
        secret,
    )
    .map_err(|rejection| AppError::InvalidSignature(rejection.to_string()))?;

    // Only an authenticated body is parsed
    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid event payload: {}", e)))?;

    let outcome = webhook::apply_event(state.db(), &event).await?;
    tracing::debug!("webhook {} -> {:?}", event.event_type, outcome);

    Ok("Webhook received")
}
