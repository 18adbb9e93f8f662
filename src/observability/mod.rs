//! Observability Module
//!
//! Prometheus metric families and the sink probes record into.

mod prometheus_metrics;
mod sink;

pub use prometheus_metrics::{GaugeVec, HistogramVec, MetricsRegistry, PrometheusExporter};
pub use sink::{MetricSink, ReasonLabels, DEFAULT_PREFIX};
