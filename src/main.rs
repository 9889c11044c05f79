use anyhow::Context;
use tracing_subscriber::EnvFilter;

use clinic_api::{app, config, is_production, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL and friends
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    let default_filter = if config.api.enable_request_logging {
        "info,tower_http=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    tracing::info!("Starting clinic API in {:?} mode", config.environment);
    if is_production!() && config.security.cors_origins.is_empty() {
        tracing::warn!("ALLOWED_ORIGINS is empty; browsers will be refused by CORS");
    }

    let state = AppState::new(config.clone()).context("failed to create managed service client")?;
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Clinic API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
