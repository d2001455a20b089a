//! Hosted auth provider client
//!
//! The session credential is opaque here: it is forwarded to the
//! provider's profile endpoint and either resolves to an identity or it
//! does not.

use async_trait::async_trait;
use serde::Deserialize;

use crate::chat::ports::{CallerIdentity, IdentityResolver};
use crate::config::AuthConfig;
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct HostedIdentityResolver {
    http: reqwest::Client,
    config: AuthConfig,
}

#[derive(Deserialize)]
struct UserProfile {
    id: String,
    #[serde(default)]
    preferred_email: Option<String>,
}

impl HostedIdentityResolver {
    pub fn new(http: reqwest::Client, config: AuthConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl IdentityResolver for HostedIdentityResolver {
    async fn resolve(&self, credential: &str) -> Result<Option<CallerIdentity>> {
        let url = format!("{}/oauth2/user_profile", self.config.issuer_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("identity lookup failed: {}", e)))?;

        if !response.status().is_success() {
            // Invalid or expired credential, not an upstream fault
            return Ok(None);
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("identity response invalid: {}", e)))?;

        Ok(Some(CallerIdentity {
            user_id: profile.id,
            email: profile.preferred_email.unwrap_or_default(),
        }))
    }
}
