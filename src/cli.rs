//! Command-line interface definition.
//!
//! Lives in the library so shell completions are generated from the same
//! definition the binary parses.

use crate::config::Overrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "procwatch")]
#[command(
    version,
    about = "Sample a running process's CPU, memory, threads and I/O, flag limit violations, and save a JSON report",
    args_conflicts_with_subcommands = true,
    after_help = "EXAMPLES:
    # Watch a process by name until Ctrl+C
    procwatch --name rusty-audio

    # Watch pid 4242 for one minute with a live chart
    procwatch watch --pid 4242 --duration 60 --plot

    # Run a command and monitor it until it exits
    procwatch exec --interval 0.5 -- cargo bench

    # Change the default CPU limit
    procwatch config set thresholds.cpu_percent 80"
)]
pub struct Cli {
    /// Print diagnostic logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Watch options used when no subcommand is given
    #[command(flatten)]
    pub watch: WatchArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor an already running process (the default)
    #[command(after_help = "EXAMPLES:
    procwatch watch --pid 4242
    procwatch watch --name 'rusty.*audio' --duration 30 --cpu-limit 50

TARGET:
    --pid wins over --name. Without either, target_pattern from the config
    file is used. A pattern is a case-insensitive regex matched against the
    process name and command line; the lowest matching pid is chosen.

CPU:
    CPU usage is measured between two reads. The first sample covers the
    time since the process was resolved rather than a full interval, and is
    included in averages and peaks.")]
    Watch(WatchArgs),

    /// Start a command and monitor it until it exits
    #[command(after_help = "EXAMPLES:
    procwatch exec -- ./target/release/rusty-audio --headless
    procwatch exec --plot --output bench.json -- cargo bench

Ctrl+C stops monitoring and kills the command.")]
    Exec {
        #[command(flatten)]
        run: RunArgs,

        /// Command to run, after `--`
        #[arg(last = true, required = true, num_args = 1.., value_name = "COMMAND")]
        command: Vec<String>,
    },

    /// Show or edit the configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Output shell completion script to stdout
    Completions {
        /// Shell to generate completions for (bash, zsh, or fish).
        /// Detected from $SHELL when omitted.
        shell: Option<String>,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Set a single configuration value
    #[command(after_help = "KEYS:
    target_pattern, interval_seconds, duration_seconds, history_capacity,
    output_path, live_chart, thresholds.cpu_percent, thresholds.memory_mb,
    thresholds.thread_count, thresholds.handle_count

Use 'none' to clear an optional value.")]
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },

    /// Restore the default configuration
    Reset,
}

/// Which process to watch.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct TargetArgs {
    /// Process id to monitor
    #[arg(short, long)]
    pub pid: Option<u32>,

    /// Regex matched against process names and command lines
    #[arg(short, long, value_name = "PATTERN")]
    pub name: Option<String>,
}

/// How to sample and report.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    /// Stop after this many seconds (0 runs until interrupted)
    #[arg(short, long, value_name = "SECONDS")]
    pub duration: Option<u64>,

    /// Seconds between samples
    #[arg(short, long, value_name = "SECONDS")]
    pub interval: Option<f64>,

    /// Where to write the JSON report
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Show a live chart instead of status lines
    #[arg(long)]
    pub plot: bool,

    /// Samples retained per metric
    #[arg(long, value_name = "SAMPLES")]
    pub capacity: Option<usize>,

    /// CPU limit in percent
    #[arg(long, value_name = "PERCENT")]
    pub cpu_limit: Option<f64>,

    /// Memory limit in MB
    #[arg(long, value_name = "MB")]
    pub memory_limit: Option<f64>,

    /// Thread count limit
    #[arg(long, value_name = "COUNT")]
    pub thread_limit: Option<u64>,

    /// Open handle limit
    #[arg(long, value_name = "COUNT")]
    pub handle_limit: Option<u64>,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct WatchArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

impl RunArgs {
    /// Converts the flags into config overrides. Target fields stay unset.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            duration_seconds: self.duration,
            interval_seconds: self.interval,
            output_path: self.output.clone(),
            live_chart: self.plot,
            history_capacity: self.capacity,
            cpu_limit: self.cpu_limit,
            memory_limit: self.memory_limit,
            thread_limit: self.thread_limit,
            handle_limit: self.handle_limit,
            ..Overrides::default()
        }
    }
}

impl WatchArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            pid: self.target.pid,
            target_pattern: self.target.name.clone(),
            ..self.run.overrides()
        }
    }
}
