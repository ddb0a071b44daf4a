//! Target process resolution.
//!
//! The monitor calls a [`ProcessResolver`] exactly once at startup. The
//! default [`SystemResolver`] looks processes up through `sysinfo`; tests
//! substitute their own resolver.

use crate::error::{ProcwatchError, Result};
use regex::{Regex, RegexBuilder};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// What the user asked to monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// An explicit process id.
    Pid(u32),
    /// A case-insensitive regex matched against the name and command line.
    Pattern(String),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Pid(pid) => write!(f, "pid {}", pid),
            Target::Pattern(pattern) => write!(f, "pattern '{}'", pattern),
        }
    }
}

/// Identity of a resolved process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cmdline: String,
}

pub trait ProcessResolver {
    /// Resolves a target to a live process.
    ///
    /// # Errors
    ///
    /// Returns [`ProcwatchError::ProcessNotFound`] when nothing matches, or
    /// [`ProcwatchError::InvalidArgument`] for a malformed pattern.
    fn resolve(&self, target: &Target) -> Result<ProcessInfo>;
}

/// Resolves processes from the live process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessResolver for SystemResolver {
    fn resolve(&self, target: &Target) -> Result<ProcessInfo> {
        let mut system = System::new();
        let refresh = ProcessRefreshKind::nothing().with_cmd(UpdateKind::OnlyIfNotSet);

        match target {
            Target::Pid(pid) => {
                let sys_pid = Pid::from_u32(*pid);
                system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[sys_pid]),
                    true,
                    refresh,
                );
                system
                    .process(sys_pid)
                    .map(|p| ProcessInfo {
                        pid: *pid,
                        name: p.name().to_string_lossy().into_owned(),
                        cmdline: join_cmd(p.cmd()),
                    })
                    .ok_or_else(|| ProcwatchError::ProcessNotFound(target.to_string()))
            }
            Target::Pattern(pattern) => {
                let regex = compile_pattern(pattern)?;
                system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);
                let candidates = system.processes().iter().map(|(pid, p)| ProcessInfo {
                    pid: pid.as_u32(),
                    name: p.name().to_string_lossy().into_owned(),
                    cmdline: join_cmd(p.cmd()),
                });
                pick_match(candidates, &regex, std::process::id())
                    .ok_or_else(|| ProcwatchError::ProcessNotFound(target.to_string()))
            }
        }
    }
}

fn join_cmd(cmd: &[std::ffi::OsString]) -> String {
    cmd.iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ProcwatchError::InvalidArgument(format!("bad process pattern: {}", e)))
}

/// Picks the lowest-pid candidate whose name or command line matches,
/// ignoring `own_pid` so the monitor never resolves to itself.
pub fn pick_match(
    candidates: impl IntoIterator<Item = ProcessInfo>,
    pattern: &Regex,
    own_pid: u32,
) -> Option<ProcessInfo> {
    candidates
        .into_iter()
        .filter(|p| p.pid != own_pid)
        .filter(|p| pattern.is_match(&p.name) || pattern.is_match(&p.cmdline))
        .min_by_key(|p| p.pid)
}
