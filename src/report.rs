//! Status lines, run summaries and the persisted JSON snapshot.

use crate::error::{ProcwatchError, Result};
use crate::history::History;
use crate::metrics::{format_bytes, Metric, Sample};
use crate::process::{Capabilities, ProcessInfo};
use crate::state::{RunRecord, StopReason};
use crate::threshold::{violation_counts, Thresholds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Number of trailing samples averaged in the per-tick status line.
pub const STATUS_AVERAGE_WINDOW: usize = 10;

/// Formats one status line for the latest sample.
///
/// Averages cover the newest [`STATUS_AVERAGE_WINDOW`] samples, or all of
/// them while fewer have been recorded.
pub fn render_line(sample: &Sample, history: &History) -> String {
    let mut line = format!(
        "[{}] CPU: {:6.1}% | Memory: {:7.1}MB ({:.1}%) | Threads: {:3} | Handles: {:4} | IO: {} read / {} written",
        sample.timestamp.format("%Y-%m-%dT%H:%M:%S"),
        sample.cpu_percent,
        sample.memory_mb(),
        sample.memory_percent,
        sample.thread_count,
        sample.handle_count,
        format_bytes(sample.read_bytes),
        format_bytes(sample.write_bytes),
    );

    if let (Ok(cpu), Ok(memory)) = (
        history.average(Metric::Cpu, STATUS_AVERAGE_WINDOW),
        history.average(Metric::Memory, STATUS_AVERAGE_WINDOW),
    ) {
        let window = history.len().min(STATUS_AVERAGE_WINDOW);
        line.push_str(&format!(
            " | avg({}) CPU: {:.1}% Memory: {:.1}MB",
            window, cpu, memory
        ));
    }

    line
}

/// Aggregate statistics for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub metric: Metric,
    pub average: f64,
    pub peak: f64,
    pub history: Vec<f64>,
}

/// Aggregate statistics over a whole run's retained history.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub sample_count: u64,
    pub metrics: Vec<MetricSummary>,
    pub violations: BTreeMap<Metric, usize>,
}

impl Summary {
    pub fn metric(&self, metric: Metric) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

/// Computes average, peak and violation count for every metric that has
/// recorded values.
///
/// # Errors
///
/// Returns [`ProcwatchError::EmptyHistory`] when nothing was recorded.
/// Callers should report an empty run rather than fail.
pub fn summarize(history: &History, thresholds: &Thresholds) -> Result<Summary> {
    if history.is_empty() {
        return Err(ProcwatchError::EmptyHistory);
    }

    let metrics = Metric::ALL
        .into_iter()
        .filter_map(|metric| {
            Some(MetricSummary {
                metric,
                average: history.average(metric, 0).ok()?,
                peak: history.peak(metric).ok()?,
                history: history.snapshot(metric),
            })
        })
        .collect();

    Ok(Summary {
        sample_count: history.total_recorded(),
        metrics,
        violations: violation_counts(history, thresholds),
    })
}

/// Persisted statistics for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub history: Vec<f64>,
    pub average: f64,
    pub peak: f64,
}

/// The JSON document written at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub run_id: String,
    pub process_id: u32,
    pub process_name: String,
    pub sample_count: u64,
    pub skipped_ticks: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stop_reason: Option<StopReason>,
    pub interval_seconds: f64,
    pub history_capacity: usize,
    pub metrics: BTreeMap<Metric, MetricReport>,
    pub thresholds: Thresholds,
    pub violations: BTreeMap<String, usize>,
}

/// Everything about a run that the snapshot needs besides its statistics.
pub struct RunContext<'a> {
    pub process: &'a ProcessInfo,
    pub record: &'a RunRecord,
    pub thresholds: &'a Thresholds,
    pub capabilities: Capabilities,
    pub interval_seconds: f64,
    pub history_capacity: usize,
}

impl Snapshot {
    /// Builds the snapshot. `summary` is `None` for a run without samples, in
    /// which case `metrics` is empty and every violation count is zero.
    pub fn build(ctx: &RunContext<'_>, summary: Option<&Summary>) -> Self {
        let metrics = summary
            .map(|s| {
                s.metrics
                    .iter()
                    .filter(|m| is_supported(m.metric, ctx.capabilities))
                    .map(|m| {
                        (
                            m.metric,
                            MetricReport {
                                history: m.history.clone(),
                                average: m.average,
                                peak: m.peak,
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let violations = ctx
            .thresholds
            .configured()
            .map(|(metric, _)| {
                let count = summary
                    .and_then(|s| s.violations.get(&metric).copied())
                    .unwrap_or(0);
                (format!("{}_exceeded", metric.key()), count)
            })
            .collect();

        Self {
            run_id: ctx.record.run_id.clone(),
            process_id: ctx.process.pid,
            process_name: ctx.process.name.clone(),
            sample_count: summary.map_or(0, |s| s.sample_count),
            skipped_ticks: ctx.record.skipped_ticks,
            started_at: ctx.record.started_at,
            finished_at: ctx.record.finished_at,
            stop_reason: ctx.record.state.stop_reason(),
            interval_seconds: ctx.interval_seconds,
            history_capacity: ctx.history_capacity,
            metrics,
            thresholds: ctx.thresholds.clone(),
            violations,
        }
    }
}

fn is_supported(metric: Metric, caps: Capabilities) -> bool {
    match metric {
        Metric::Threads => caps.thread_count,
        Metric::Handles => caps.handle_count,
        Metric::ReadBytes | Metric::WriteBytes => caps.io_counters,
        Metric::Cpu | Metric::Memory => true,
    }
}

/// Writes the snapshot as pretty-printed JSON, creating parent directories.
///
/// # Errors
///
/// Returns [`ProcwatchError::PersistFailure`] when the file cannot be written.
pub fn persist(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(snapshot)?;
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    };
    write().map_err(|source| ProcwatchError::PersistFailure {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a previously persisted snapshot.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
