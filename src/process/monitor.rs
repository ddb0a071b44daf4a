//! Process resource sampling using sysinfo.
//!
//! CPU and memory come from `sysinfo`; on Linux the thread count and open
//! file descriptor count are read from `/proc/<pid>`.

use crate::error::{ProcwatchError, Result};
use crate::metrics::Sample;
use chrono::Utc;
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

/// Which optional counters a sampler can actually read.
///
/// An unsupported counter is reported as `0` in every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub thread_count: bool,
    pub handle_count: bool,
    pub io_counters: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            thread_count: true,
            handle_count: false,
            io_counters: true,
        }
    }
}

/// Produces one [`Sample`] per call for a single process.
pub trait MetricSampler {
    fn capabilities(&self) -> Capabilities;

    /// Reads the current counters.
    ///
    /// # Errors
    ///
    /// - [`ProcwatchError::ProcessExited`] when the process is gone or a zombie
    /// - [`ProcwatchError::AccessDenied`] when the OS refuses the read
    /// - [`ProcwatchError::ProcessUnavailable`] for any other read failure
    fn sample(&mut self) -> Result<Sample>;
}

/// Samples a process by PID through `sysinfo::System`.
///
/// CPU usage is computed by sysinfo from the difference between two
/// refreshes. The constructor performs one refresh so the first call to
/// [`sample`](MetricSampler::sample) already measures usage over a real
/// interval instead of reporting 0.
pub struct ProcessMonitor {
    system: System,
    pid: Pid,
    total_memory: u64,
    capabilities: Capabilities,
}

impl ProcessMonitor {
    pub fn new(pid: u32) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let total_memory = system.total_memory();

        let mut monitor = Self {
            system,
            pid: Pid::from_u32(pid),
            total_memory,
            capabilities: probe_capabilities(pid),
        };
        monitor.refresh();
        monitor
    }

    fn refresh(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_disk_usage(),
        );
    }
}

impl MetricSampler for ProcessMonitor {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn sample(&mut self) -> Result<Sample> {
        self.refresh();
        let pid = self.pid.as_u32();

        let process = self
            .system
            .process(self.pid)
            .ok_or(ProcwatchError::ProcessExited(pid))?;
        if matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead) {
            return Err(ProcwatchError::ProcessExited(pid));
        }

        let cpu = process.cpu_usage() as f64;
        let cpu_percent = if cpu.is_finite() { cpu.max(0.0) } else { 0.0 };
        let memory_bytes = process.memory();
        let memory_percent = if self.total_memory > 0 {
            memory_bytes as f64 / self.total_memory as f64 * 100.0
        } else {
            0.0
        };
        let disk = process.disk_usage();

        let thread_count = if self.capabilities.thread_count {
            os::thread_count(pid)?
        } else {
            0
        };
        let handle_count = if self.capabilities.handle_count {
            os::handle_count(pid)?
        } else {
            0
        };

        Ok(Sample {
            timestamp: Utc::now(),
            cpu_percent,
            memory_bytes,
            memory_percent,
            thread_count,
            handle_count,
            read_bytes: disk.total_read_bytes,
            write_bytes: disk.total_written_bytes,
        })
    }
}

fn probe_capabilities(pid: u32) -> Capabilities {
    Capabilities {
        thread_count: os::thread_count(pid).is_ok(),
        handle_count: os::handle_count(pid).is_ok(),
        io_counters: true,
    }
}

#[cfg(target_os = "linux")]
mod os {
    use crate::error::{ProcwatchError, Result};
    use std::fs;
    use std::io;

    fn map_io_error(pid: u32, err: io::Error) -> ProcwatchError {
        match err.kind() {
            io::ErrorKind::NotFound => ProcwatchError::ProcessExited(pid),
            io::ErrorKind::PermissionDenied => ProcwatchError::AccessDenied(pid),
            _ => ProcwatchError::ProcessUnavailable {
                pid,
                reason: err.to_string(),
            },
        }
    }

    /// Reads the `Threads:` line of `/proc/<pid>/status`.
    pub fn thread_count(pid: u32) -> Result<u64> {
        let status = fs::read_to_string(format!("/proc/{}/status", pid))
            .map_err(|e| map_io_error(pid, e))?;
        parse_threads(&status).ok_or_else(|| ProcwatchError::ProcessUnavailable {
            pid,
            reason: "no Threads entry in /proc status".to_string(),
        })
    }

    /// Counts open file descriptors in `/proc/<pid>/fd`.
    pub fn handle_count(pid: u32) -> Result<u64> {
        let entries =
            fs::read_dir(format!("/proc/{}/fd", pid)).map_err(|e| map_io_error(pid, e))?;
        Ok(entries.flatten().count() as u64)
    }

    pub fn parse_threads(status: &str) -> Option<u64> {
        status
            .lines()
            .find_map(|line| line.strip_prefix("Threads:"))
            .and_then(|rest| rest.trim().parse().ok())
    }
}

#[cfg(not(target_os = "linux"))]
mod os {
    use crate::error::{ProcwatchError, Result};

    pub fn thread_count(pid: u32) -> Result<u64> {
        Err(ProcwatchError::ProcessUnavailable {
            pid,
            reason: "thread count is not supported on this platform".to_string(),
        })
    }

    pub fn handle_count(pid: u32) -> Result<u64> {
        Err(ProcwatchError::ProcessUnavailable {
            pid,
            reason: "handle count is not supported on this platform".to_string(),
        })
    }
}
