//! Sample records and the fixed set of tracked metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bytes per mebibyte, used to express memory in MB everywhere a human reads it.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One timestamped reading of a process's resource counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// CPU usage since the previous refresh (can exceed 100 on multi-core).
    pub cpu_percent: f64,
    /// Resident set size in bytes.
    pub memory_bytes: u64,
    /// Resident set size as a share of total system memory.
    #[serde(default)]
    pub memory_percent: f64,
    pub thread_count: u64,
    pub handle_count: u64,
    /// Cumulative bytes read since the process started.
    pub read_bytes: u64,
    /// Cumulative bytes written since the process started.
    pub write_bytes: u64,
}

impl Sample {
    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / BYTES_PER_MB
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            cpu_percent: 0.0,
            memory_bytes: 0,
            memory_percent: 0.0,
            thread_count: 0,
            handle_count: 0,
            read_bytes: 0,
            write_bytes: 0,
        }
    }
}

/// A tracked metric.
///
/// The declaration order is the order in which metrics are evaluated,
/// reported and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Cpu,
    Memory,
    Threads,
    Handles,
    ReadBytes,
    WriteBytes,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Cpu,
        Metric::Memory,
        Metric::Threads,
        Metric::Handles,
        Metric::ReadBytes,
        Metric::WriteBytes,
    ];

    /// Stable key used in reports (`metrics.<key>`, `violations.<key>_exceeded`).
    pub fn key(self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Threads => "threads",
            Metric::Handles => "handles",
            Metric::ReadBytes => "read_bytes",
            Metric::WriteBytes => "write_bytes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Memory => "Memory",
            Metric::Threads => "Threads",
            Metric::Handles => "Handles",
            Metric::ReadBytes => "Read",
            Metric::WriteBytes => "Write",
        }
    }

    /// The scalar recorded in history for this metric.
    pub fn value(self, sample: &Sample) -> f64 {
        match self {
            Metric::Cpu => sample.cpu_percent,
            Metric::Memory => sample.memory_mb(),
            Metric::Threads => sample.thread_count as f64,
            Metric::Handles => sample.handle_count as f64,
            Metric::ReadBytes => sample.read_bytes as f64,
            Metric::WriteBytes => sample.write_bytes as f64,
        }
    }

    /// Formats a value of this metric with its unit.
    pub fn format_value(self, value: f64) -> String {
        match self {
            Metric::Cpu => format!("{:.1}%", value),
            Metric::Memory => format!("{:.1}MB", value),
            Metric::Threads | Metric::Handles => format!("{:.0}", value),
            Metric::ReadBytes | Metric::WriteBytes => format_bytes(value as u64),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Formats a byte count with a binary unit suffix (e.g. `1.5MB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{}B", bytes)
    } else {
        format!("{:.1}{}", value, UNITS[unit])
    }
}
