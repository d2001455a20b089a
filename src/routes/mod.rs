//! HTTP routes

pub mod billing;
pub mod chat;
pub mod health;
pub mod webhook;

use axum::http::HeaderMap;
use axum::Router;

use crate::state::AppState;

/// Assemble the full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/v1/chat", chat::router())
        .nest("/api/v1/billing", billing::router())
        .nest("/api/v1/webhooks", webhook::router())
        .with_state(state)
}

/// Pull the session credential off a request
///
/// Accepts `Authorization: Bearer {token}` or the `mn_session` cookie.
/// The token itself is opaque; the identity resolver decides whether it
/// means anything.
pub(crate) fn session_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(value) = auth.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "mn_session").then(|| value.to_string())
    })
}
