//! Configuration management for Margin Notes Server

use std::env;
use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub openai: OpenAiConfig,
    pub index: IndexConfig,
    pub auth: AuthConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Completion and embedding API settings
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub chat_model: String,
    pub embedding_model: String,
}

/// Vector index settings (one namespace per file)
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub host: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub issuer_url: String,
}

/// Payment webhook settings
///
/// `secret` is deliberately optional: the webhook handler fails closed
/// with a 500 when it is missing, it never accepts unsigned events.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub secret: Option<String>,
    pub allowed_ips: Vec<IpAddr>,
}

/// Paddle delivery addresses (sandbox + production)
const DEFAULT_WEBHOOK_IPS: &[&str] = &[
    // Sandbox
    "34.194.127.46",
    "54.234.237.108",
    "3.208.120.145",
    "44.226.236.210",
    "44.241.183.62",
    "100.20.172.113",
    // Production
    "34.232.58.13",
    "34.195.105.136",
    "34.237.3.244",
    "35.155.119.135",
    "52.11.166.252",
    "34.212.5.7",
];

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./margin-notes.db".to_string(),
            },
            openai: OpenAiConfig {
                api_key: None,
                api_base: "https://api.openai.com/v1".to_string(),
                chat_model: "gpt-4o-mini".to_string(),
                embedding_model: "text-embedding-3-small".to_string(),
            },
            index: IndexConfig {
                host: "http://localhost:5080".to_string(),
                api_key: None,
            },
            auth: AuthConfig {
                issuer_url: "http://localhost:8787".to_string(),
            },
            webhook: WebhookConfig {
                secret: None,
                allowed_ips: default_webhook_ips(),
            },
        }
    }
}

fn default_webhook_ips() -> Vec<IpAddr> {
    DEFAULT_WEBHOOK_IPS
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            openai: OpenAiConfig {
                api_key: env::var("OPENAI_API_KEY").ok(),
                api_base: env::var("OPENAI_API_BASE").unwrap_or(defaults.openai.api_base),
                chat_model: env::var("OPENAI_CHAT_MODEL").unwrap_or(defaults.openai.chat_model),
                embedding_model: env::var("OPENAI_EMBEDDING_MODEL")
                    .unwrap_or(defaults.openai.embedding_model),
            },
            index: IndexConfig {
                host: env::var("INDEX_HOST").unwrap_or(defaults.index.host),
                api_key: env::var("INDEX_API_KEY").ok(),
            },
            auth: AuthConfig {
                issuer_url: env::var("AUTH_ISSUER_URL").unwrap_or(defaults.auth.issuer_url),
            },
            webhook: WebhookConfig {
                secret: env::var("PADDLE_WEBHOOK_KEY").ok(),
                allowed_ips: match env::var("WEBHOOK_ALLOWED_IPS") {
                    Ok(list) => list
                        .split(',')
                        .filter_map(|s| s.trim().parse().ok())
                        .collect(),
                    Err(_) => defaults.webhook.allowed_ips,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allow_list_parses() {
        let config = Config::default();
        assert_eq!(config.webhook.allowed_ips.len(), DEFAULT_WEBHOOK_IPS.len());
    }
}
