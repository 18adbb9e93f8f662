//! Release Availability Server Binary
//!
//! Loads the check configuration, runs the probe loop and serves the
//! resulting metrics until SIGINT or SIGTERM.

use anyhow::Context;
use clap::Parser;
use release_availability::{
    build_probes, Config, MetricSink, MetricsServer, ProbeScheduler, PrometheusExporter,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Release Availability - probe exporter for git, registries and HTTP endpoints
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the YAML configuration
    #[arg(default_value = "server-config.yaml")]
    config: String,

    /// Override service.listen_port
    #[arg(short = 'p', long)]
    listen_port: Option<u16>,
}

/// `RUST_LOG` plus info for the library and this binary
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("release_availability=info".parse()?)
        .add_directive("release_availability_server=info".parse()?))
}

async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("cannot install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt().with_env_filter(log_filter()?).init();

    let args = Args::parse();

    info!("loading config from: {}", args.config);
    let mut config = Config::load(&args.config)
        .with_context(|| format!("cannot load config {}", args.config))?;
    if let Some(port) = args.listen_port {
        config.service = config.service.with_listen_port(port);
    }
    info!("Poll interval: {:?}", config.service.poll_period());

    let exporter = PrometheusExporter::new();
    let sink = MetricSink::new(
        exporter.registry(),
        &config.service.metrics_prefix,
        config.service.reason_labels,
    );
    let probes = build_probes(&config, &sink)?;
    if probes.is_empty() {
        warn!("no checks configured");
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let scheduler = ProbeScheduler::new(probes, config.service.poll_period())
        .with_max_concurrent(config.service.max_concurrent_probes);
    let checks = scheduler.spawn(cancel.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.service.listen_port));
    let server = MetricsServer::bind(addr, exporter)
        .await
        .with_context(|| format!("cannot listen on {}", addr))?;

    let serve = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = server.run(cancel.clone()).await {
                error!("server error: {}", e);
                cancel.cancel();
            }
        }
    });
    cancel.cancelled().await;

    info!("shutting down server");
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, serve).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("server task failed: {}", e),
        Err(_) => warn!("server did not stop within {:?}", SHUTDOWN_TIMEOUT),
    }

    if let Err(e) = checks.await {
        error!("check loop failed: {}", e);
    }

    Ok(())
}
