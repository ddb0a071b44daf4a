pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod output;
pub mod process;
pub mod report;
pub mod session;
pub mod signal;
pub mod state;
pub mod threshold;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{Config, MonitorConfig};
pub use error::{ProcwatchError, Result};
pub use history::History;
pub use metrics::{Metric, Sample};
pub use process::{ProcessInfo, ProcessMonitor, ProcessResolver, SystemResolver, Target};
pub use report::{persist, render_line, summarize, Snapshot, Summary};
pub use session::{MonitorSession, RunLimits, TickView};
pub use signal::SignalHandler;
pub use state::{RunState, StopReason};
pub use threshold::{evaluate, Thresholds, Violation};
