//! Exec command handler.
//!
//! Starts a command, monitors it until it exits or the user interrupts,
//! then reports the command's exit status and writes the report.

use std::path::Path;
use std::process::{Child, Command, Stdio};

use super::watch::{finalize_run, run_session};
use crate::config::MonitorConfig;
use crate::error::{ProcwatchError, Result};
use crate::output::{print_child_exit, print_info, print_target};
use crate::process::{MetricSampler, ProcessInfo, ProcessMonitor};
use crate::session::MonitorSession;
use crate::signal::SignalHandler;
use crate::state::StopReason;
use crate::ui::select_view;
use tracing::{debug, info};

/// Report file used by `exec` when `--output` is not given.
pub const EXEC_OUTPUT_PATH: &str = "exec_metrics.json";

/// Spawns `program` with `args`.
///
/// The child's output goes to the terminal in console mode and is discarded
/// when the live chart owns the screen.
fn spawn_child(program: &str, args: &[String], quiet: bool) -> Result<Child> {
    let mut command = Command::new(program);
    command.args(args);
    if quiet {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }
    command.spawn().map_err(|source| ProcwatchError::Spawn {
        command: program.to_string(),
        source,
    })
}

/// Identity shown for the spawned command: the program's file name and the
/// full command line.
fn describe_child(pid: u32, command: &[String]) -> ProcessInfo {
    let name = command
        .first()
        .map(|program| {
            Path::new(program)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(program)
                .to_string()
        })
        .unwrap_or_default();
    ProcessInfo {
        pid,
        name,
        cmdline: command.join(" "),
    }
}

/// Run `command` and monitor it.
///
/// `config.output_path` should already default to [`EXEC_OUTPUT_PATH`] when
/// the user gave none.
///
/// # Errors
///
/// Fails when `command` is empty, cannot be started, or the Ctrl+C handler
/// cannot be installed.
pub fn exec_command(config: &MonitorConfig, command: &[String]) -> Result<()> {
    let (program, args) = command.split_first().ok_or_else(|| {
        ProcwatchError::InvalidArgument("exec needs a command to run after '--'".to_string())
    })?;

    let shutdown = SignalHandler::new()?;
    let mut child = spawn_child(program, args, config.live_chart)?;
    let process = describe_child(child.id(), command);
    info!(pid = process.pid, command = %process.cmdline, "spawned command");
    print_info(&format!("Started '{}' as pid {}", process.cmdline, process.pid));

    let mut sampler = ProcessMonitor::new(process.pid);
    let name = process.name.clone();
    print_target(&process, config, sampler.capabilities());

    let mut session =
        MonitorSession::new(process, config.thresholds.clone(), config.history_capacity);
    let mut view = select_view(config.live_chart);
    let reason = run_session(&mut session, &mut sampler, view.as_mut(), &shutdown, config);
    drop(view);

    if reason != StopReason::ProcessExited {
        // The child may already have exited on the same SIGINT.
        if let Err(e) = child.kill() {
            debug!(error = %e, "child already gone");
        }
    }
    let status = child.wait()?;
    info!(?status, "command finished");
    print_child_exit(&name, status);

    finalize_run(&session, sampler.capabilities(), config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Overrides};

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_describe_child_uses_file_name() {
        let info = describe_child(12, &args(&["/usr/bin/cargo", "bench", "--quiet"]));
        assert_eq!(info.pid, 12);
        assert_eq!(info.name, "cargo");
        assert_eq!(info.cmdline, "/usr/bin/cargo bench --quiet");
    }

    #[test]
    fn test_describe_child_plain_program() {
        let info = describe_child(1, &args(&["rusty-audio"]));
        assert_eq!(info.name, "rusty-audio");
    }

    #[test]
    fn test_spawn_missing_program_is_spawn_error() {
        let result = spawn_child("procwatch-no-such-program-xyz", &[], true);
        match result {
            Err(ProcwatchError::Spawn { command, .. }) => {
                assert_eq!(command, "procwatch-no-such-program-xyz")
            }
            other => panic!("expected spawn error, got {:?}", other.map(|c| c.id())),
        }
    }

    #[test]
    fn test_exec_rejects_empty_command() {
        let config = MonitorConfig::resolve(&Config::default(), &Overrides::default()).unwrap();
        assert!(matches!(
            exec_command(&config, &[]),
            Err(ProcwatchError::InvalidArgument(_))
        ));
    }
}
