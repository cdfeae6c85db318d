//! Liveness HTTP endpoint for the hosting platform's health checks.

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use log::info;

pub async fn serve(port: u16) -> Result<()> {
    let app = Router::new()
        .route("/", get(|| async { "Oxford relay bot is running" }))
        .route("/healthz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Keep-alive server listening on port {port}");
    axum::serve(listener, app).await?;
    Ok(())
}
