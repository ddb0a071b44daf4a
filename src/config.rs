use crate::error::{ProcwatchError, Result};
use crate::history::DEFAULT_CAPACITY;
use crate::threshold::Thresholds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "procwatch";
const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_OUTPUT_PATH: &str = "performance_metrics.json";

// ============================================================================
// File configuration
// ============================================================================

/// Settings loaded from `~/.config/procwatch/config.toml`.
///
/// Missing fields fall back to their defaults, so a partial file is valid.
///
/// # Example
///
/// ```toml
/// target_pattern = "rusty-audio"
/// interval_seconds = 1.0
/// duration_seconds = 0
///
/// [thresholds]
/// cpu_percent = 25.0
/// memory_mb = 500.0
/// thread_count = 20
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Regex used to find the target when no pid is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_pattern: Option<String>,

    /// Seconds between samples.
    pub interval_seconds: f64,

    /// How long to monitor; 0 runs until interrupted or the process exits.
    pub duration_seconds: u64,

    /// Samples retained per metric.
    pub history_capacity: usize,

    /// Where the JSON report is written.
    pub output_path: String,

    /// Whether to show the live terminal chart.
    pub live_chart: bool,

    pub thresholds: Thresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_pattern: None,
            interval_seconds: 1.0,
            duration_seconds: 0,
            history_capacity: DEFAULT_CAPACITY,
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
            live_chart: false,
            thresholds: Thresholds::default(),
        }
    }
}

// ============================================================================
// Config Validation
// ============================================================================

use std::error::Error;
use std::fmt;

/// Longest accepted sampling interval: one day.
pub const MAX_INTERVAL_SECONDS: f64 = 86_400.0;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The sampling interval is not a number, not positive, or above
    /// [`MAX_INTERVAL_SECONDS`].
    InvalidInterval(f64),
    /// History must retain at least one sample.
    ZeroCapacity,
    /// A threshold limit is negative or not a number.
    InvalidThreshold { key: &'static str, value: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidInterval(v) => write!(
                f,
                "interval_seconds must be above 0 and at most {} seconds, got {}",
                MAX_INTERVAL_SECONDS, v
            ),
            ConfigError::ZeroCapacity => {
                write!(f, "history_capacity must be at least 1")
            }
            ConfigError::InvalidThreshold { key, value } => {
                write!(f, "thresholds.{} must be a non-negative number, got {}", key, value)
            }
        }
    }
}

impl Error for ConfigError {}

/// Validate interval, capacity and thresholds.
pub fn validate_config(config: &Config) -> std::result::Result<(), ConfigError> {
    validate_settings(
        config.interval_seconds,
        config.history_capacity,
        &config.thresholds,
    )
}

fn validate_settings(
    interval_seconds: f64,
    history_capacity: usize,
    thresholds: &Thresholds,
) -> std::result::Result<(), ConfigError> {
    if !(interval_seconds > 0.0 && interval_seconds <= MAX_INTERVAL_SECONDS) {
        return Err(ConfigError::InvalidInterval(interval_seconds));
    }
    if history_capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    let float_limits = [
        ("cpu_percent", thresholds.cpu_percent),
        ("memory_mb", thresholds.memory_mb),
    ];
    for (key, limit) in float_limits {
        if let Some(value) = limit {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { key, value });
            }
        }
    }
    Ok(())
}

// ============================================================================
// Runtime configuration
// ============================================================================

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub pid: Option<u32>,
    pub target_pattern: Option<String>,
    pub duration_seconds: Option<u64>,
    pub interval_seconds: Option<f64>,
    pub output_path: Option<PathBuf>,
    pub live_chart: bool,
    pub history_capacity: Option<usize>,
    pub cpu_limit: Option<f64>,
    pub memory_limit: Option<f64>,
    pub thread_limit: Option<u64>,
    pub handle_limit: Option<u64>,
}

/// The effective configuration of one run. Built at startup, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub pid: Option<u32>,
    pub target_pattern: Option<String>,
    pub duration_seconds: u64,
    pub interval_seconds: f64,
    pub output_path: PathBuf,
    pub live_chart: bool,
    pub history_capacity: usize,
    pub thresholds: Thresholds,
}

impl MonitorConfig {
    /// Merges file settings with command-line overrides and validates the result.
    pub fn resolve(config: &Config, overrides: &Overrides) -> Result<Self> {
        let mut thresholds = config.thresholds.clone();
        if let Some(limit) = overrides.cpu_limit {
            thresholds.cpu_percent = Some(limit);
        }
        if let Some(limit) = overrides.memory_limit {
            thresholds.memory_mb = Some(limit);
        }
        if let Some(limit) = overrides.thread_limit {
            thresholds.thread_count = Some(limit);
        }
        if let Some(limit) = overrides.handle_limit {
            thresholds.handle_count = Some(limit);
        }

        let resolved = Self {
            pid: overrides.pid,
            target_pattern: overrides
                .target_pattern
                .clone()
                .or_else(|| config.target_pattern.clone()),
            duration_seconds: overrides.duration_seconds.unwrap_or(config.duration_seconds),
            interval_seconds: overrides.interval_seconds.unwrap_or(config.interval_seconds),
            output_path: overrides
                .output_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.output_path)),
            live_chart: overrides.live_chart || config.live_chart,
            history_capacity: overrides.history_capacity.unwrap_or(config.history_capacity),
            thresholds,
        };

        validate_settings(
            resolved.interval_seconds,
            resolved.history_capacity,
            &resolved.thresholds,
        )
        .map_err(|e| ProcwatchError::Config(e.to_string()))?;

        Ok(resolved)
    }
}

// ============================================================================
// Loading and saving
// ============================================================================

const DEFAULT_CONFIG_WITH_COMMENTS: &str = r#"# procwatch configuration
# Command-line flags override every value in this file.

# Regex (case-insensitive) matched against process names and command lines
# when no --pid is given.
# target_pattern = "rusty-audio"

# Seconds between samples.
interval_seconds = 1.0

# How long to monitor in seconds. 0 runs until Ctrl+C or the process exits.
duration_seconds = 0

# Samples retained per metric. Older samples are overwritten.
history_capacity = 100

# Where the JSON report is written when monitoring stops.
output_path = "performance_metrics.json"

# Show a live terminal chart instead of one status line per sample.
live_chart = false

# Upper limits. A sample above a limit prints a warning and counts as a
# violation in the report. Remove a line to disable that check.
[thresholds]
cpu_percent = 25.0
memory_mb = 500.0
thread_count = 20
# handle_count = 1000
"#;

/// Get the procwatch config directory path (~/.config/procwatch/).
///
/// Returns the path to the config directory. Does not create the directory.
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProcwatchError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Get the path to the config file.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// Load the configuration from `~/.config/procwatch/config.toml`.
///
/// If the config file doesn't exist, it creates one with default values
/// and comments explaining each option.
pub fn load_config() -> Result<Config> {
    load_config_at(&config_path()?)
}

/// Load the configuration from an explicit path, creating it if missing.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written, or contains
/// invalid TOML.
pub fn load_config_at(path: &Path) -> Result<Config> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_WITH_COMMENTS)?;
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    parse_config(&content).map_err(|e| match e {
        ProcwatchError::Config(msg) => ProcwatchError::Config(format!(
            "Failed to parse config file at {:?}: {}",
            path, msg
        )),
        other => other,
    })
}

/// Parse and validate config file contents.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).map_err(|e| ProcwatchError::Config(e.to_string()))?;
    validate_config(&config).map_err(|e| ProcwatchError::Config(e.to_string()))?;
    Ok(config)
}

/// Save the configuration to an explicit path with explanatory comments.
///
/// This overwrites any existing file, including user-added comments.
pub fn save_config_at(config: &Config, path: &Path) -> Result<()> {
    validate_config(config).map_err(|e| ProcwatchError::Config(e.to_string()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, generate_config_with_comments(config))?;
    Ok(())
}

fn optional_line<T: fmt::Display>(key: &str, value: Option<T>, example: &str) -> String {
    match value {
        Some(v) => format!("{} = {}", key, v),
        None => format!("# {} = {}", key, example),
    }
}

fn float_literal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Generate config file content with explanatory comments.
fn generate_config_with_comments(config: &Config) -> String {
    let pattern_line = match &config.target_pattern {
        Some(p) => format!("target_pattern = {}", toml_string(p)),
        None => "# target_pattern = \"rusty-audio\"".to_string(),
    };
    let t = &config.thresholds;

    format!(
        r#"# procwatch configuration
# Command-line flags override every value in this file.

# Regex (case-insensitive) matched against process names and command lines
# when no --pid is given.
{pattern_line}

# Seconds between samples.
interval_seconds = {interval}

# How long to monitor in seconds. 0 runs until Ctrl+C or the process exits.
duration_seconds = {duration}

# Samples retained per metric. Older samples are overwritten.
history_capacity = {capacity}

# Where the JSON report is written when monitoring stops.
output_path = {output}

# Show a live terminal chart instead of one status line per sample.
live_chart = {live_chart}

# Upper limits. A sample above a limit prints a warning and counts as a
# violation in the report. Remove a line to disable that check.
[thresholds]
{cpu}
{memory}
{threads}
{handles}
"#,
        interval = float_literal(config.interval_seconds),
        duration = config.duration_seconds,
        capacity = config.history_capacity,
        output = toml_string(&config.output_path),
        live_chart = config.live_chart,
        cpu = optional_line("cpu_percent", t.cpu_percent.map(float_literal), "25.0"),
        memory = optional_line("memory_mb", t.memory_mb.map(float_literal), "500.0"),
        threads = optional_line("thread_count", t.thread_count, "20"),
        handles = optional_line("handle_count", t.handle_count, "1000"),
    )
}

fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

/// Keys accepted by [`set_config_value`].
pub const VALID_KEYS: &[&str] = &[
    "target_pattern",
    "interval_seconds",
    "duration_seconds",
    "history_capacity",
    "output_path",
    "live_chart",
    "thresholds.cpu_percent",
    "thresholds.memory_mb",
    "thresholds.thread_count",
    "thresholds.handle_count",
];

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ProcwatchError::Config(format!("Invalid value for {}: '{}'", key, value)))
}

/// Parses an optional value where `none` (or an empty string) clears it.
fn parse_optional<T: std::str::FromStr>(key: &str, value: &str) -> Result<Option<T>> {
    match value.trim() {
        "" | "none" => Ok(None),
        v => parse_value(key, v).map(Some),
    }
}

/// Update a single key on `config`, then validate the result.
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "target_pattern" => config.target_pattern = parse_optional(key, value)?,
        "interval_seconds" => config.interval_seconds = parse_value(key, value)?,
        "duration_seconds" => config.duration_seconds = parse_value(key, value)?,
        "history_capacity" => config.history_capacity = parse_value(key, value)?,
        "output_path" => config.output_path = value.to_string(),
        "live_chart" => config.live_chart = parse_value(key, value)?,
        "thresholds.cpu_percent" => config.thresholds.cpu_percent = parse_optional(key, value)?,
        "thresholds.memory_mb" => config.thresholds.memory_mb = parse_optional(key, value)?,
        "thresholds.thread_count" => config.thresholds.thread_count = parse_optional(key, value)?,
        "thresholds.handle_count" => config.thresholds.handle_count = parse_optional(key, value)?,
        _ => {
            return Err(ProcwatchError::Config(format!(
                "Unknown config key '{}'. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }
    validate_config(config).map_err(|e| ProcwatchError::Config(e.to_string()))
}
