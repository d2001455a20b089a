//! Subscription event handling
//!
//! Applied only after signature verification. Activation events locate
//! the user by the correlation id embedded in `custom_data`; update
//! events locate the user by provider subscription id. Unrecognized
//! event types are accepted as no-ops so the provider does not retry
//! them forever.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::db::users::{SubscriptionUpdate, UserRepository};
use crate::error::Result;

/// Provider event envelope
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    /// Provider subscription id
    pub id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub items: Vec<SubscriptionItem>,
    #[serde(default)]
    pub current_billing_period: Option<BillingPeriod>,
    #[serde(default)]
    pub custom_data: Option<CustomData>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Debug, Deserialize)]
pub struct Price {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct BillingPeriod {
    pub ends_at: DateTime<Utc>,
}

/// Application-supplied correlation data attached at checkout
#[derive(Debug, Deserialize)]
pub struct CustomData {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// What a delivery did to local state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Activated,
    Updated,
    /// Recognized event, but no matching user record
    NoMatchingUser,
    /// Unrecognized event type, accepted without effect
    Ignored,
}

impl WebhookEvent {
    fn subscription_update(&self) -> SubscriptionUpdate {
        SubscriptionUpdate {
            subscription_id: self.data.id.clone(),
            customer_id: self.data.customer_id.clone(),
            price_id: self
                .data
                .items
                .first()
                .and_then(|i| i.price.as_ref())
                .map(|p| p.id.clone()),
            current_period_end: self.data.current_billing_period.as_ref().map(|p| p.ends_at),
        }
    }
}

/// Apply a verified event to subscription state
pub async fn apply_event(pool: &SqlitePool, event: &WebhookEvent) -> Result<EventOutcome> {
    let users = UserRepository::new(pool);

    match event.event_type.as_str() {
        "subscription.created" | "subscription.activated" => {
            let Some(user_id) = event
                .data
                .custom_data
                .as_ref()
                .and_then(|c| c.user_id.as_deref())
            else {
                tracing::warn!(
                    "activation event {} carries no correlation user id",
                    event.data.id
                );
                return Ok(EventOutcome::NoMatchingUser);
            };

            let applied = users
                .apply_subscription(user_id, &event.subscription_update())
                .await?;
            if applied {
                tracing::info!("subscription {} activated for {}", event.data.id, user_id);
                Ok(EventOutcome::Activated)
            } else {
                Ok(EventOutcome::NoMatchingUser)
            }
        }
        "subscription.updated" => {
            let applied = users
                .refresh_subscription(&event.subscription_update())
                .await?;
            if applied {
                tracing::info!("subscription {} refreshed", event.data.id);
                Ok(EventOutcome::Updated)
            } else {
                Ok(EventOutcome::NoMatchingUser)
            }
        }
        other => {
            tracing::debug!("ignoring webhook event type {}", other);
            Ok(EventOutcome::Ignored)
        }
    }
}
