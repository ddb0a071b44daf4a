use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcwatchError {
    #[error("No process matches {0}")]
    ProcessNotFound(String),

    #[error("Process {pid} could not be sampled: {reason}")]
    ProcessUnavailable { pid: u32, reason: String },

    #[error("Access denied while reading process {0}")]
    AccessDenied(u32),

    #[error("Process {0} has exited")]
    ProcessExited(u32),

    #[error("No samples have been recorded")]
    EmptyHistory,

    #[error("Failed to write report to {path}: {source}")]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Signal handler error: {0}")]
    SignalHandler(String),

    #[error("Failed to spawn command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProcwatchError {
    /// Whether the monitor loop may skip this error and keep sampling.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProcwatchError::ProcessUnavailable { .. } | ProcwatchError::AccessDenied(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProcwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_errors_are_recoverable() {
        let unavailable = ProcwatchError::ProcessUnavailable {
            pid: 42,
            reason: "refresh failed".to_string(),
        };
        assert!(unavailable.is_recoverable());
        assert!(ProcwatchError::AccessDenied(42).is_recoverable());
    }

    #[test]
    fn test_terminal_errors_are_not_recoverable() {
        assert!(!ProcwatchError::ProcessExited(42).is_recoverable());
        assert!(!ProcwatchError::ProcessNotFound("pid 42".to_string()).is_recoverable());
        assert!(!ProcwatchError::EmptyHistory.is_recoverable());
    }

    #[test]
    fn test_error_messages_name_the_process() {
        let err = ProcwatchError::AccessDenied(1234);
        assert!(err.to_string().contains("1234"));

        let err = ProcwatchError::ProcessNotFound("pattern 'rusty'".to_string());
        assert_eq!(err.to_string(), "No process matches pattern 'rusty'");
    }

    #[test]
    fn test_persist_failure_keeps_path() {
        let err = ProcwatchError::PersistFailure {
            path: PathBuf::from("/nope/report.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing dir"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/nope/report.json"));
        assert!(msg.contains("missing dir"));
    }
}
