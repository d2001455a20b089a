//! Payment-provider webhook handling
//!
//! A delivery is authenticated before any state mutation: source IP
//! allow-list, then signature-header parsing, then a constant-time
//! HMAC check over the raw body. Only an accepted delivery is parsed
//! as JSON and applied to subscription state.

pub mod events;
pub mod signature;

pub use events::{apply_event, EventOutcome, WebhookEvent};
pub use signature::{verify, Rejection};
