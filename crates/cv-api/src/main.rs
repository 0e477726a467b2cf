//! CV API Server
//!
//! Serves the chat assistant behind the CV/portfolio site.

use cv_api::{create_router, AppState};
use cv_core::AppConfig;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cv_api=debug,tower_http=debug".into()),
        )
        .init();

    // Fail fast on missing configuration; a missing secret should never
    // become a per-request 500.
    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let production = config.server.production;

    let state = Arc::new(AppState::from_config(config)?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("CV API server starting on http://{}", addr);
    if !production {
        tracing::info!("Development endpoints enabled (/api/kv, /api/kv-get)");
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
