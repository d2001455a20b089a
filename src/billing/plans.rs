//! Plan catalogue and subscription status
//!
//! Subscription status is derived at read time, never stored: a user is
//! subscribed while a price id is set and the billing period (plus one
//! day of grace for late renewal webhooks) has not lapsed.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::User;

/// Grace period after the billing-period end before access lapses
const RENEWAL_GRACE_DAYS: i64 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub name: &'static str,
    pub slug: &'static str,
    pub quota: u32,
    pub pages_per_pdf: u32,
    pub amount: u32,
    pub price_id: &'static str,
}

pub const PLANS: [Plan; 2] = [
    Plan {
        name: "Free",
        slug: "free",
        quota: 5,
        pages_per_pdf: 3,
        amount: 0,
        price_id: "",
    },
    Plan {
        name: "Pro",
        slug: "pro",
        quota: 50,
        pages_per_pdf: 25,
        amount: 10,
        price_id: "pri_01j2fjpg9wkf1b0qydst0mcn7m",
    },
];

/// Plan matching a provider price id
pub fn plan_for_price(price_id: &str) -> Option<&'static Plan> {
    PLANS
        .iter()
        .find(|p| !p.price_id.is_empty() && p.price_id == price_id)
}

/// Whether a user's subscription is currently active
pub fn is_subscribed(user: &User, now: DateTime<Utc>) -> bool {
    let Some(period_end) = user.current_period_end() else {
        return false;
    };
    user.paddle_price_id.is_some() && now < period_end + Duration::days(RENEWAL_GRACE_DAYS)
}

/// Derived subscription read-model for a user
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPlan {
    pub plan: &'static Plan,
    pub is_subscribed: bool,
    pub subscription_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

pub fn subscription_plan(user: &User, now: DateTime<Utc>) -> SubscriptionPlan {
    let subscribed = is_subscribed(user, now);

    let plan = if subscribed {
        user.paddle_price_id
            .as_deref()
            .and_then(plan_for_price)
            .unwrap_or(&PLANS[0])
    } else {
        &PLANS[0]
    };

    SubscriptionPlan {
        plan,
        is_subscribed: subscribed,
        subscription_id: user.paddle_subscription_id.clone(),
        current_period_end: user.current_period_end(),
    }
}
