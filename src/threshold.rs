//! Static resource limits and per-sample violation checks.

use crate::history::History;
use crate::metrics::{Metric, Sample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper limits for the tracked metrics. `None` disables a check.
///
/// Set once at startup and never mutated during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_count: Option<u64>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_percent: Some(25.0),
            memory_mb: Some(500.0),
            thread_count: Some(20),
            handle_count: None,
        }
    }
}

impl Thresholds {
    /// No limits at all.
    pub fn none() -> Self {
        Self {
            cpu_percent: None,
            memory_mb: None,
            thread_count: None,
            handle_count: None,
        }
    }

    /// The limit for a metric, in the same unit the metric records.
    pub fn limit(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Cpu => self.cpu_percent,
            Metric::Memory => self.memory_mb,
            Metric::Threads => self.thread_count.map(|v| v as f64),
            Metric::Handles => self.handle_count.map(|v| v as f64),
            Metric::ReadBytes | Metric::WriteBytes => None,
        }
    }

    /// Configured limits in metric order.
    pub fn configured(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .into_iter()
            .filter_map(|m| self.limit(m).map(|limit| (m, limit)))
    }

    pub fn is_empty(&self) -> bool {
        self.configured().next().is_none()
    }
}

/// A metric that exceeded its limit at one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    pub metric: Metric,
    pub observed: f64,
    pub limit: f64,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "High {}: {} > {}",
            self.metric.label(),
            self.metric.format_value(self.observed),
            self.metric.format_value(self.limit)
        )
    }
}

/// Returns every metric of `sample` strictly above its limit, in metric order.
pub fn evaluate(sample: &Sample, thresholds: &Thresholds) -> Vec<Violation> {
    thresholds
        .configured()
        .filter_map(|(metric, limit)| {
            let observed = metric.value(sample);
            (observed > limit).then_some(Violation {
                metric,
                observed,
                limit,
            })
        })
        .collect()
}

/// Counts retained history entries above each configured limit.
pub fn violation_counts(history: &History, thresholds: &Thresholds) -> BTreeMap<Metric, usize> {
    thresholds
        .configured()
        .map(|(metric, limit)| (metric, history.exceeding(metric, limit)))
        .collect()
}
