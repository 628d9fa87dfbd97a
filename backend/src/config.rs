//! Environment-driven configuration.
//!
//! All settings come from environment variables (a `.env` file is honored in
//! development via dotenvy). Secrets have no defaults; the server refuses to
//! start without them.

use crate::error::{AppError, Result};

/// Runtime configuration shared through application state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string
    pub database_url: String,
    /// TCP port the HTTP server binds to
    pub port: u16,
    /// Public origin of the web frontend, used to build checkout redirect
    /// and password-reset URLs (e.g. "https://app.example.com")
    pub public_url: String,

    /// HS256 signing secret for access tokens
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub jwt_ttl_secs: i64,

    /// Generative-AI provider base URL
    pub ai_base_url: String,
    /// Generative-AI provider API key
    pub ai_api_key: String,
    /// Model identifier requested for contract analysis
    pub ai_model: String,

    /// Payment provider base URL
    pub payment_base_url: String,
    /// Payment provider secret API key
    pub payment_secret_key: String,
    /// Webhook signing secret shared with the payment provider
    pub payment_webhook_secret: String,

    /// SMTP relay host for password-reset mail
    pub smtp_host: String,
    pub smtp_username: String,
    pub smtp_password: String,
    /// From address on outgoing mail
    pub smtp_from: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            port: optional("PORT", "8080")
                .parse()
                .map_err(|_| AppError::Config("PORT must be a number".to_string()))?,
            public_url: optional("PUBLIC_URL", "http://localhost:5173"),

            jwt_secret: require("JWT_SECRET")?,
            jwt_ttl_secs: optional("JWT_TTL_SECS", "86400")
                .parse()
                .map_err(|_| AppError::Config("JWT_TTL_SECS must be a number".to_string()))?,

            ai_base_url: optional("AI_BASE_URL", "https://generativeai.example.com"),
            ai_api_key: require("AI_API_KEY")?,
            ai_model: optional("AI_MODEL", "flash-latest"),

            payment_base_url: optional("PAYMENT_BASE_URL", "https://api.stripe.com"),
            payment_secret_key: require("PAYMENT_SECRET_KEY")?,
            payment_webhook_secret: require("PAYMENT_WEBHOOK_SECRET")?,

            smtp_host: optional("SMTP_HOST", "localhost"),
            smtp_username: optional("SMTP_USERNAME", ""),
            smtp_password: optional("SMTP_PASSWORD", ""),
            smtp_from: optional("SMTP_FROM", "no-reply@leaseguard.local"),
        })
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| AppError::Config(format!("{} is not set", key)))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
