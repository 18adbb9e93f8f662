//! Probe Module
//!
//! One execution contract shared by every probe kind. A probe runs its
//! check, converts the result into an [`Outcome`] and records it through
//! the [`MetricSink`]. Errors never escape a probe.

mod git;
mod http;
mod registry;

pub use git::{GitCli, GitClient, GitProbe};
pub use http::HttpProbe;
pub use registry::RegistryProbe;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ConfigError, ProbeError, ProbeResult};
use crate::observability::MetricSink;
use crate::outcome::Outcome;
use crate::registry::{ClientOptions, HttpTransport, ReqwestTransport};

#[async_trait]
pub trait Probe: Send + Sync {
    /// Check name, the gauge's only label
    fn name(&self) -> &str;

    /// Probe kind, for logs
    fn kind(&self) -> &'static str;

    /// Run the check once and record its outcome
    async fn execute(&self, cancel: &CancellationToken) -> Outcome;
}

/// Run `check` until it finishes or `cancel` fires, then log and record.
///
/// Dropping the check future aborts its in-flight request. Cancelled
/// executions are returned but not recorded.
pub async fn record_check<F>(
    name: &str,
    kind: &'static str,
    sink: &MetricSink,
    cancel: &CancellationToken,
    check: F,
) -> Outcome
where
    F: Future<Output = ProbeResult<()>>,
{
    info!(check = name, kind, "running check");

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProbeError::Cancelled),
        result = check => result,
    };
    let outcome = Outcome::from_result(&result);

    match &result {
        Ok(()) => info!(check = name, "check succeeded"),
        Err(ProbeError::Cancelled) => {
            debug!(check = name, "check cancelled, outcome not recorded");
            return outcome;
        }
        Err(e) => warn!(check = name, kind = e.kind(), error = %e, "check failed"),
    }

    sink.record_outcome(name, &outcome);
    outcome
}

/// Build every configured probe, in git, registry, http order
pub fn build_probes(
    config: &Config,
    sink: &MetricSink,
) -> Result<Vec<Box<dyn Probe>>, ConfigError> {
    let timeout = config.service.request_timeout();
    let mut probes: Vec<Box<dyn Probe>> = Vec::with_capacity(config.checks.len());

    let git: Arc<dyn GitClient> = Arc::new(GitCli::new(timeout));
    for target in &config.checks.git {
        probes.push(Box::new(GitProbe::new(target, git.clone(), sink.clone())));
    }

    if !config.checks.quay.is_empty() {
        let transport: Arc<dyn HttpTransport> = Arc::new(
            ReqwestTransport::new(&ClientOptions::default().with_timeout(timeout))
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
        );
        for target in &config.checks.quay {
            probes.push(Box::new(RegistryProbe::new(
                target,
                transport.clone(),
                sink.clone(),
            )));
        }
    }

    for target in &config.checks.http {
        let options = ClientOptions {
            timeout,
            insecure: target.insecure,
            follow_redirects: target.follow,
            identity_pem: target.identity_pem(),
        };
        let transport = ReqwestTransport::new(&options).map_err(|e| ConfigError::Tls {
            check: target.name.clone(),
            message: e.to_string(),
        })?;
        probes.push(Box::new(HttpProbe::new(
            target,
            Arc::new(transport),
            sink.clone(),
        )));
    }

    Ok(probes)
}
