use crate::AppCore;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use super::router;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port to listen on (default: 8080)
    pub port: u16,
    /// CORS allowed origins; empty allows any
    pub cors_origins: Vec<String>,
    /// Bearer token for the admin routes. Admin routes are closed when unset.
    pub admin_token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            admin_token: None,
        }
    }
}

pub struct HttpServer {
    config: HttpConfig,
    core: Arc<AppCore>,
}

impl HttpServer {
    pub fn new(config: HttpConfig, core: Arc<AppCore>) -> Self {
        Self { config, core }
    }

    fn build_router(&self) -> Router {
        router::build_router(self.core.clone(), &self.config)
    }

    /// Serve until a message arrives on `shutdown`.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let app = self.build_router();
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            addr = %addr,
            admin_enabled = self.config.admin_token.is_some(),
            "HTTP server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await?;

        Ok(())
    }
}
