//! Prometheus Metrics Export
//!
//! Labeled gauge and histogram families rendered in Prometheus text format.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Default Prometheus histogram buckets
const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricType {
    Gauge,
    Histogram,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
        }
    }
}

fn check_arity(name: &str, labels: &[String], values: &[&str]) -> bool {
    if labels.len() != values.len() {
        warn!(
            metric = name,
            expected = labels.len(),
            got = values.len(),
            "label value count mismatch, sample dropped"
        );
        return false;
    }
    true
}

fn key(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Escape a label value for the text exposition format
fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn format_labels(names: &[String], values: &[String], extra: Option<(&str, &str)>) -> String {
    let mut pairs: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();
    if let Some((k, v)) = extra {
        pairs.push(format!("{}=\"{}\"", k, v));
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", pairs.join(","))
    }
}

fn write_header(out: &mut String, name: &str, help: &str, metric_type: MetricType) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, metric_type.as_str());
}

/// Gauge family keyed by label values
#[derive(Debug)]
pub struct GaugeVec {
    name: String,
    help: String,
    labels: Vec<String>,
    series: DashMap<Vec<String>, AtomicU64>,
}

impl GaugeVec {
    pub fn new(name: &str, help: &str, labels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            series: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the value of one series
    pub fn set(&self, values: &[&str], value: f64) {
        if !check_arity(&self.name, &self.labels, values) {
            return;
        }
        self.series
            .entry(key(values))
            .or_insert_with(|| AtomicU64::new(0))
            .store(value.to_bits(), Ordering::Relaxed);
    }

    /// Current value of one series
    pub fn get(&self, values: &[&str]) -> Option<f64> {
        self.series
            .get(&key(values))
            .map(|v| f64::from_bits(v.load(Ordering::Relaxed)))
    }

    fn render(&self, out: &mut String) {
        write_header(out, &self.name, &self.help, MetricType::Gauge);

        let mut rows: Vec<(Vec<String>, f64)> = self
            .series
            .iter()
            .map(|e| (e.key().clone(), f64::from_bits(e.value().load(Ordering::Relaxed))))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        for (values, value) in rows {
            let _ = writeln!(
                out,
                "{}{} {}",
                self.name,
                format_labels(&self.labels, &values, None),
                value
            );
        }
    }
}

#[derive(Debug, Clone)]
struct HistogramState {
    /// Non-cumulative bucket counts
    counts: Vec<u64>,
    sum: f64,
    count: u64,
}

/// Histogram family keyed by label values
#[derive(Debug)]
pub struct HistogramVec {
    name: String,
    help: String,
    labels: Vec<String>,
    buckets: Vec<f64>,
    series: DashMap<Vec<String>, Mutex<HistogramState>>,
}

impl HistogramVec {
    pub fn new(name: &str, help: &str, labels: &[&str]) -> Self {
        Self::with_buckets(name, help, labels, &DEFAULT_BUCKETS)
    }

    pub fn with_buckets(name: &str, help: &str, labels: &[&str], buckets: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            buckets: buckets.to_vec(),
            series: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Observe one value into a series
    pub fn observe(&self, values: &[&str], value: f64) {
        if !check_arity(&self.name, &self.labels, values) {
            return;
        }
        let entry = self.series.entry(key(values)).or_insert_with(|| {
            Mutex::new(HistogramState {
                counts: vec![0; self.buckets.len()],
                sum: 0.0,
                count: 0,
            })
        });

        let mut state = entry.lock();
        if let Some(idx) = self.buckets.iter().position(|b| value <= *b) {
            state.counts[idx] += 1;
        }
        state.sum += value;
        state.count += 1;
    }

    /// Number of observations in one series
    pub fn sample_count(&self, values: &[&str]) -> Option<u64> {
        self.series.get(&key(values)).map(|s| s.lock().count)
    }

    /// Number of distinct label sets
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    fn render(&self, out: &mut String) {
        write_header(out, &self.name, &self.help, MetricType::Histogram);

        let mut rows: Vec<(Vec<String>, HistogramState)> = self
            .series
            .iter()
            .map(|e| (e.key().clone(), e.value().lock().clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        for (values, state) in rows {
            let mut cumulative = 0;
            for (bound, count) in self.buckets.iter().zip(&state.counts) {
                cumulative += count;
                let le = bound.to_string();
                let _ = writeln!(
                    out,
                    "{}_bucket{} {}",
                    self.name,
                    format_labels(&self.labels, &values, Some(("le", &le))),
                    cumulative
                );
            }
            let _ = writeln!(
                out,
                "{}_bucket{} {}",
                self.name,
                format_labels(&self.labels, &values, Some(("le", "+Inf"))),
                state.count
            );
            let labels = format_labels(&self.labels, &values, None);
            let _ = writeln!(out, "{}_sum{} {}", self.name, labels, state.sum);
            let _ = writeln!(out, "{}_count{} {}", self.name, labels, state.count);
        }
    }
}

#[derive(Debug, Clone)]
enum Family {
    Gauge(Arc<GaugeVec>),
    Histogram(Arc<HistogramVec>),
}

/// Metrics registry
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    families: RwLock<Vec<Family>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gauge family
    pub fn register_gauge(&self, gauge: GaugeVec) -> Arc<GaugeVec> {
        let gauge = Arc::new(gauge);
        self.families.write().push(Family::Gauge(gauge.clone()));
        gauge
    }

    /// Register a histogram family
    pub fn register_histogram(&self, histogram: HistogramVec) -> Arc<HistogramVec> {
        let histogram = Arc::new(histogram);
        self.families
            .write()
            .push(Family::Histogram(histogram.clone()));
        histogram
    }

    /// Export all metrics in Prometheus format
    pub fn export(&self) -> String {
        let families = self.families.read();
        let mut output = String::new();

        for family in families.iter() {
            match family {
                Family::Gauge(g) => g.render(&mut output),
                Family::Histogram(h) => h.render(&mut output),
            }
        }

        output
    }
}

/// Prometheus metrics exporter
#[derive(Debug, Clone, Default)]
pub struct PrometheusExporter {
    registry: Arc<MetricsRegistry>,
}

impl PrometheusExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        self.registry.export()
    }
}
