mod config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Context;
use config::ServerConfig;
use keypool_core::AppCore;
use keypool_core::http::HttpServer;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Human-readable logs by default; `KEYPOOL_LOG_JSON` switches to JSON lines.
fn init_tracing() {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,keypool_server=debug,keypool_core=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    if std::env::var_os("KEYPOOL_LOG_JSON").is_some() {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting KeyPool server");

    let config = ServerConfig::load()?;
    let db_path = config.database_path()?;
    let core = Arc::new(
        AppCore::with_endpoints(&db_path, config.endpoints.clone())
            .await
            .context("Failed to initialize app core")?,
    );

    if config.admin_token.is_none() {
        tracing::warn!("KEYPOOL_ADMIN_TOKEN is not set; admin routes will reject every request");
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            return;
        }
        tracing::info!("Ctrl-C received");
        let _ = shutdown_tx.send(());
    });

    HttpServer::new(config.http_config(), core)
        .run(shutdown_rx)
        .await
}
