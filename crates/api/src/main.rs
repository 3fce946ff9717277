//! Leadflow server entry point

use std::sync::Arc;

use anyhow::Context as _;
use leadflow_api::utils::logging::init_tracing;
use leadflow_api::{create_app, AppContext};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "could not read .env"),
    }

    let config = leadflow_infra::config::load().context("loading configuration")?;
    let bind_addr = config.server.bind_addr.clone();

    let context = Arc::new(AppContext::new(config).await.context("initialising application")?);
    let app = create_app(Arc::clone(&context));

    let listener =
        TcpListener::bind(&bind_addr).await.with_context(|| format!("binding {bind_addr}"))?;
    info!(addr = %bind_addr, "leadflow listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    context.shutdown().await.context("shutting down")?;
    info!("leadflow stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
