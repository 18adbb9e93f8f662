//! Release Availability
//!
//! Periodically probes git repositories, container image registries and
//! HTTP endpoints, and publishes an up/down gauge plus an outcome
//! histogram per check for Prometheus to scrape.

pub mod config;
pub mod error;
pub mod observability;
pub mod outcome;
pub mod probe;
pub mod registry;
pub mod scheduler;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{Config, Credentials, GitTarget, HttpTarget, RegistryTarget, ServiceConfig};
pub use error::{ConfigError, ProbeError};
pub use observability::{MetricSink, MetricsRegistry, PrometheusExporter, ReasonLabels};
pub use outcome::{Outcome, Status};
pub use probe::{build_probes, GitProbe, HttpProbe, Probe, RegistryProbe};
pub use registry::{AuthChallenge, ImageReference, RegistryClient};
pub use scheduler::ProbeScheduler;
pub use server::MetricsServer;
