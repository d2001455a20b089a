//! Chat API endpoint
//!
//! `POST /` asks a question about a file. The response body is a stream
//! of length-prefixed delta frames (see `chat::framing`); it begins
//! before the full answer is known.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use serde::Deserialize;

use crate::chat::framing;
use crate::error::{AppError, Result};
use crate::routes::session_credential;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(send_message))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub file_id: String,
    pub message: String,
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response> {
    let credential = session_credential(&headers).ok_or(AppError::Unauthenticated)?;
    let caller = state.orchestrator().resolve_caller(&credential).await?;

    if req.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let deltas = state
        .orchestrator()
        .handle_chat_turn(&caller, &req.file_id, &req.message)
        .await?;

    // Frame each delta; an upstream failure mid-stream surfaces as a
    // truncated body, the 200 status is already on the wire.
    let body = Body::from_stream(deltas.map(|event| {
        event
            .map(|delta| Bytes::from(framing::encode(&delta)))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    }));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(response)
}
