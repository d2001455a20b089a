//! Billing API endpoints

use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use chrono::Utc;

use crate::billing::{self, SubscriptionPlan, PLANS};
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::routes::session_credential;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/subscription", get(get_subscription))
}

/// Plan catalogue
async fn list_plans() -> Json<Vec<billing::Plan>> {
    Json(PLANS.to_vec())
}

/// The caller's derived subscription state
async fn get_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SubscriptionPlan>> {
    let credential = session_credential(&headers).ok_or(AppError::Unauthenticated)?;
    let caller = state.orchestrator().resolve_caller(&credential).await?;

    let user = UserRepository::new(state.db())
        .get(&caller.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(billing::subscription_plan(&user, Utc::now())))
}
