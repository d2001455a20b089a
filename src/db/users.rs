//! User records and subscription state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

/// User record
///
/// The id matches the external identity provider's subject. Subscription
/// fields are only written by the webhook event handler.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub paddle_subscription_id: Option<String>,
    pub paddle_customer_id: Option<String>,
    pub paddle_price_id: Option<String>,
    pub paddle_current_period_end: Option<String>,
    pub created_at: String,
}

impl User {
    /// Parsed billing-period end, if any
    pub fn current_period_end(&self) -> Option<DateTime<Utc>> {
        self.paddle_current_period_end
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Subscription fields applied by a webhook event
#[derive(Debug, Clone)]
pub struct SubscriptionUpdate {
    pub subscription_id: String,
    pub customer_id: Option<String>,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by id
    pub async fn get(&self, user_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, paddle_subscription_id, paddle_customer_id,
                   paddle_price_id, paddle_current_period_end, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by provider subscription id
    pub async fn get_by_subscription(&self, subscription_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, paddle_subscription_id, paddle_customer_id,
                   paddle_price_id, paddle_current_period_end, created_at
            FROM users
            WHERE paddle_subscription_id = ?
            "#,
        )
        .bind(subscription_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Create a user (first sign-in callback)
    pub async fn create(&self, user_id: &str, email: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Apply subscription fields to a user matched by id
    pub async fn apply_subscription(
        &self,
        user_id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<bool> {
        let period_end = update.current_period_end.map(|dt| dt.to_rfc3339());

        let result = sqlx::query(
            r#"
            UPDATE users
            SET paddle_subscription_id = ?,
                paddle_customer_id = COALESCE(?, paddle_customer_id),
                paddle_price_id = COALESCE(?, paddle_price_id),
                paddle_current_period_end = COALESCE(?, paddle_current_period_end)
            WHERE id = ?
            "#,
        )
        .bind(&update.subscription_id)
        .bind(&update.customer_id)
        .bind(&update.price_id)
        .bind(&period_end)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Refresh price and period on a user matched by subscription id
    pub async fn refresh_subscription(&self, update: &SubscriptionUpdate) -> Result<bool> {
        let period_end = update.current_period_end.map(|dt| dt.to_rfc3339());

        let result = sqlx::query(
            r#"
            UPDATE users
            SET paddle_price_id = COALESCE(?, paddle_price_id),
                paddle_current_period_end = COALESCE(?, paddle_current_period_end)
            WHERE paddle_subscription_id = ?
            "#,
        )
        .bind(&update.price_id)
        .bind(&period_end)
        .bind(&update.subscription_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
