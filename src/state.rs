use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    DurationElapsed,
    UserInterrupt,
    ProcessExited,
}

impl StopReason {
    pub fn describe(&self) -> &'static str {
        match self {
            StopReason::DurationElapsed => "duration elapsed",
            StopReason::UserInterrupt => "stopped by user",
            StopReason::ProcessExited => "process exited",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "reason")]
pub enum RunState {
    Resolving,
    Sampling,
    Stopped(StopReason),
}

impl RunState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, RunState::Stopped(_))
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            RunState::Stopped(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Bookkeeping for one monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Ticks attempted so far, including skipped ones.
    pub ticks: u64,
    /// Ticks whose sample could not be read.
    pub skipped_ticks: u64,
}

impl RunRecord {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            state: RunState::Resolving,
            started_at: Utc::now(),
            finished_at: None,
            ticks: 0,
            skipped_ticks: 0,
        }
    }

    /// Moves to `state`. Once stopped, further transitions are ignored.
    pub fn transition_to(&mut self, state: RunState) {
        if self.state.is_stopped() {
            return;
        }
        self.state = state;
        if state.is_stopped() {
            self.finished_at = Some(Utc::now());
        }
    }
}

impl Default for RunRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_resolving() {
        let record = RunRecord::new();
        assert_eq!(record.state, RunState::Resolving);
        assert!(record.finished_at.is_none());
        assert_eq!(record.ticks, 0);
        assert_eq!(record.run_id.len(), 36);
    }

    #[test]
    fn test_transition_to_stopped_sets_finish_time() {
        let mut record = RunRecord::new();
        record.transition_to(RunState::Sampling);
        assert!(record.finished_at.is_none());
        record.transition_to(RunState::Stopped(StopReason::ProcessExited));
        assert!(record.finished_at.is_some());
        assert_eq!(record.state.stop_reason(), Some(StopReason::ProcessExited));
    }

    #[test]
    fn test_stopped_is_terminal() {
        let mut record = RunRecord::new();
        record.transition_to(RunState::Stopped(StopReason::UserInterrupt));
        record.transition_to(RunState::Sampling);
        record.transition_to(RunState::Stopped(StopReason::DurationElapsed));
        assert_eq!(record.state, RunState::Stopped(StopReason::UserInterrupt));
    }

    #[test]
    fn test_stop_reason_serialization() {
        let json = serde_json::to_string(&StopReason::DurationElapsed).unwrap();
        assert_eq!(json, "\"duration_elapsed\"");
        let state = serde_json::to_value(RunState::Stopped(StopReason::UserInterrupt)).unwrap();
        assert_eq!(state["state"], "stopped");
        assert_eq!(state["reason"], "user_interrupt");
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunRecord::new().run_id, RunRecord::new().run_id);
    }
}
