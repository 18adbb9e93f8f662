//! Metric Sink
//!
//! Records probe outcomes into the availability gauge and outcome histogram.

use serde::Deserialize;
use std::sync::Arc;

use super::prometheus_metrics::{GaugeVec, HistogramVec, MetricsRegistry};
use crate::outcome::{Outcome, Status};

pub const DEFAULT_PREFIX: &str = "metrics_server";

/// How the `reason` histogram label is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonLabels {
    /// The outcome's diagnostic message, unbounded
    #[default]
    Raw,
    /// The error class, from a closed set
    Classified,
}

/// Writes outcomes into the two metric families
#[derive(Debug, Clone)]
pub struct MetricSink {
    gauge: Arc<GaugeVec>,
    histogram: Arc<HistogramVec>,
    reason_labels: ReasonLabels,
}

impl MetricSink {
    /// Create the families under `prefix` and register them
    pub fn new(registry: &MetricsRegistry, prefix: &str, reason_labels: ReasonLabels) -> Self {
        let prefix = if prefix.is_empty() { DEFAULT_PREFIX } else { prefix };
        let lower = prefix.to_lowercase();

        let gauge = registry.register_gauge(GaugeVec::new(
            &format!("{}_check_gauge", lower),
            &format!("{} check_gauge", prefix),
            &["check"],
        ));
        let histogram = registry.register_histogram(HistogramVec::new(
            &format!("{}_check_histogram", lower),
            &format!("{} check_histogram", prefix),
            &["check", "reason", "status"],
        ));

        Self {
            gauge,
            histogram,
            reason_labels,
        }
    }

    /// Set the gauge to `1 - code` and count one event for the outcome class
    pub fn record(&self, target: &str, reason: &str, status: Status, code: u8) {
        self.gauge.set(&[target], f64::from(1 - code.min(1)));
        self.histogram.observe(&[target, reason, status.as_str()], 1.0);
    }

    pub fn record_outcome(&self, target: &str, outcome: &Outcome) {
        let reason = match (self.reason_labels, outcome.kind()) {
            (ReasonLabels::Classified, Some(kind)) => kind,
            _ => outcome.reason(),
        };
        self.record(target, reason, outcome.status(), outcome.code());
    }

    pub fn gauge(&self) -> &GaugeVec {
        &self.gauge
    }

    pub fn histogram(&self) -> &HistogramVec {
        &self.histogram
    }
}
