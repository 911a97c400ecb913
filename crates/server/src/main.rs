mod bootstrap;
mod chat;
mod health;

use std::time::Duration;

use anyhow::Result;
use expensebot_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use expensebot_core::config::LogFormat::*;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins when set; otherwise the configured level applies.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let router = health::router(app.db_pool.clone())
        .merge(chat::router(app.db_pool.clone(), app.transcriber.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        speech_capability = app.transcriber.is_some(),
        "expensebot-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!(event_name = "system.server.stopping", "expensebot-server stopping");
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    tokio::time::timeout(grace, app.db_pool.close()).await.ok();

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!(event_name = "system.server.shutdown_signal", "shutdown signal received");
    }
}
