//! HTTP endpoint that exposes [`AuthorityMetrics`] for a Prometheus scraper.

use std::net::SocketAddr;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use dirauth_node::{AuthorityMetrics, StopListener};

pub const METRICS_ROUTE: &str = "/metrics";

/// Serve `metrics` on `port` until `shutdown` fires.
pub async fn serve(
    port: u16,
    metrics: AuthorityMetrics,
    mut shutdown: StopListener,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(METRICS_ROUTE, get(render))
        .with_state(metrics);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics endpoint listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.stopped().await;
        })
        .await
}

async fn render(State(metrics): State<AuthorityMetrics>) -> (StatusCode, String) {
    match metrics.gather_text() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unable to encode metrics: {e}"),
        ),
    }
}
