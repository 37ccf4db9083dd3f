use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// A missing `GEMINI_API_KEY` is a fatal configuration error at startup —
/// no request is ever attempted without a credential.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    /// When set, rate-limit windows are shared across instances via Redis.
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max_requests: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            redis_url: std::env::var("REDIS_URL").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            rate_limit_window_ms: std::env::var("RATE_LIMIT_WINDOW_MS")
                .unwrap_or_else(|_| "60000".to_string())
                .parse::<u64>()
                .context("RATE_LIMIT_WINDOW_MS must be a number of milliseconds")?,
            rate_limit_max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(|_| "2".to_string())
                .parse::<usize>()
                .context("RATE_LIMIT_MAX_REQUESTS must be a positive integer")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
