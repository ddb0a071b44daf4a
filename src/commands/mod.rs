//! CLI command handlers for procwatch.
//!
//! # Commands
//!
//! - [`watch`] - Monitor a running process (default)
//! - [`exec`] - Start a command and monitor it
//! - [`config`] - Display and edit the configuration file

mod config;
mod exec;
mod watch;

pub use config::{config_display_command, config_reset_command, config_set_command};
pub use exec::{exec_command, EXEC_OUTPUT_PATH};
pub use watch::{finalize_run, run_session, target_for, watch_command, RunOutcome};
