mod config;
mod errors;
mod generation;
mod llm_client;
mod rate_limit;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::rate_limit::{MemoryStore, RateLimitStore, RateLimiter, RedisStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing GEMINI_API_KEY)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting coach API v{}", env!("CARGO_PKG_VERSION"));

    // Rate-limit store: Redis when configured, otherwise process-local
    let store: Arc<dyn RateLimitStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Redis rate-limit store initialized");
            Arc::new(RedisStore::new(client))
        }
        None => {
            info!("In-memory rate-limit store initialized");
            Arc::new(MemoryStore::new())
        }
    };

    let limiter = Arc::new(RateLimiter::new(
        Duration::from_millis(config.rate_limit_window_ms),
        config.rate_limit_max_requests,
        store,
    ));
    info!(
        "Rate limiter: {} requests per {}ms window",
        config.rate_limit_max_requests, config.rate_limit_window_ms
    );

    // Initialize LLM client
    let llm = GeminiClient::new(config.gemini_api_key.clone());
    info!(
        "LLM client initialized (default model: {})",
        llm_client::DEFAULT_MODEL
    );

    // Build app state
    let state = AppState {
        llm,
        limiter,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
