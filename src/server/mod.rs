//! Server Module
//!
//! HTTP endpoint exposing the current metric values.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::observability::PrometheusExporter;

pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

async fn metrics(State(exporter): State<PrometheusExporter>) -> impl IntoResponse {
    ([(CONTENT_TYPE, TEXT_FORMAT)], exporter.export())
}

async fn healthz() -> &'static str {
    "ok"
}

/// `/metrics` and `/healthz` routes
pub fn router(exporter: PrometheusExporter) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(exporter)
}

/// Metrics exposition server
pub struct MetricsServer {
    listener: TcpListener,
    exporter: PrometheusExporter,
}

impl MetricsServer {
    /// Bind the listener
    pub async fn bind(addr: SocketAddr, exporter: PrometheusExporter) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, exporter })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `cancel` fires, then drain open connections
    pub async fn run(self, cancel: CancellationToken) -> std::io::Result<()> {
        info!("server starting at {}", self.local_addr()?);

        axum::serve(self.listener, router(self.exporter))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("server stopped");
        Ok(())
    }
}
