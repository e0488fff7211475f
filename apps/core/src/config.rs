use anyhow::{Context, Result};

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_auth_token: Option<String>,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_base_url: require_env("API_BASE_URL")?,
            api_auth_token: std::env::var("API_AUTH_TOKEN").ok(),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "2".to_string())
                .parse::<u64>()
                .context("POLL_INTERVAL_SECS must be a positive integer")?,
            poll_max_attempts: std::env::var("POLL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u32>()
                .context("POLL_MAX_ATTEMPTS must be a positive integer")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
