//! Subscription plans and the derived subscription read-model

pub mod plans;

pub use plans::{is_subscribed, plan_for_price, subscription_plan, Plan, SubscriptionPlan, PLANS};
