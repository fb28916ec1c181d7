use anyhow::{Context, Result};
use dashform::DashformConfig;
use dashform_server::{app, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var("DASHFORM_CONFIG").unwrap_or_else(|_| "dashform.toml".to_string());
    let config = DashformConfig::load(&config_path)?;
    let addr = config.server.addr();

    info!(config = %config_path, session = ?config.session.storage, "dashform-server starting");

    let state = AppState::new(config).await?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}
