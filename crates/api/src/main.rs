use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use crosslist_api::app::{build_app, build_services};
use crosslist_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crosslist_observability::init();

    let config = AppConfig::from_env().context("loading configuration")?;
    let services = Arc::new(build_services(&config).context("wiring services")?);
    let shutdown = services.shutdown.clone();
    let app = build_app(services);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await
        .context("server error")?;
    Ok(())
}
