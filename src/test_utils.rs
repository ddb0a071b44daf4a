//! Test utilities shared across modules.
//!
//! Fakes for the OS-facing collaborators so the sampling loop can be driven
//! deterministically.

use crate::error::{ProcwatchError, Result};
use crate::metrics::Sample;
use crate::process::{Capabilities, MetricSampler, ProcessInfo, ProcessResolver, Target};
use crate::session::{sleep_until_shutdown, TickFrame, TickView, Wake};
use crate::signal::SignalHandler;
use crate::threshold::Thresholds;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::time::Duration;

pub const TEST_PID: u32 = 4242;

pub fn test_process() -> ProcessInfo {
    ProcessInfo {
        pid: TEST_PID,
        name: "rusty-audio".to_string(),
        cmdline: "/opt/rusty-audio --gui".to_string(),
    }
}

/// Samples with the given CPU values, one second apart.
pub fn cpu_samples(values: &[f64]) -> Vec<Sample> {
    let start = Utc::now();
    values
        .iter()
        .enumerate()
        .map(|(i, cpu)| Sample {
            timestamp: start + ChronoDuration::seconds(i as i64),
            cpu_percent: *cpu,
            memory_bytes: 64 * 1024 * 1024,
            thread_count: 4,
            ..Sample::default()
        })
        .collect()
}

/// Resolver that knows exactly one process, or none.
pub struct FakeResolver {
    process: Option<ProcessInfo>,
}

impl FakeResolver {
    pub fn with(process: ProcessInfo) -> Self {
        Self {
            process: Some(process),
        }
    }

    pub fn empty() -> Self {
        Self { process: None }
    }
}

impl ProcessResolver for FakeResolver {
    fn resolve(&self, target: &Target) -> Result<ProcessInfo> {
        self.process
            .clone()
            .ok_or_else(|| ProcwatchError::ProcessNotFound(target.to_string()))
    }
}

pub enum SampleStep {
    Sample(Sample),
    Fail(ProcwatchError),
}

/// Sampler that replays scripted steps and reports the process as exited
/// once they run out.
pub struct FakeSampler {
    steps: VecDeque<SampleStep>,
    repeat: Option<Sample>,
}

impl FakeSampler {
    pub fn new(steps: Vec<SampleStep>) -> Self {
        Self {
            steps: steps.into(),
            repeat: None,
        }
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self::new(samples.into_iter().map(SampleStep::Sample).collect())
    }

    /// Returns the same sample forever.
    pub fn endless(sample: Sample) -> Self {
        Self {
            steps: VecDeque::new(),
            repeat: Some(sample),
        }
    }
}

impl MetricSampler for FakeSampler {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn sample(&mut self) -> Result<Sample> {
        match self.steps.pop_front() {
            Some(SampleStep::Sample(sample)) => Ok(sample),
            Some(SampleStep::Fail(err)) => Err(err),
            None => match &self.repeat {
                Some(sample) => Ok(Sample {
                    timestamp: Utc::now(),
                    ..sample.clone()
                }),
                None => Err(ProcwatchError::ProcessExited(TEST_PID)),
            },
        }
    }
}

/// View that records what it was shown.
#[derive(Default)]
pub struct RecordingView {
    pub started: bool,
    pub ticks: Vec<u64>,
    pub violations: Vec<(u64, usize)>,
    pub skipped: Vec<u64>,
    pub finished: bool,
    interrupt_after: Option<usize>,
}

impl RecordingView {
    /// Reports an interrupt from `wait` once `ticks` samples were shown.
    pub fn interrupt_after(ticks: usize) -> Self {
        Self {
            interrupt_after: Some(ticks),
            ..Self::default()
        }
    }

    pub fn violation_ticks(&self) -> Vec<u64> {
        self.violations.iter().map(|(tick, _)| *tick).collect()
    }
}

impl TickView for RecordingView {
    fn start(&mut self, _process: &ProcessInfo, _thresholds: &Thresholds) {
        self.started = true;
    }

    fn on_tick(&mut self, frame: &TickFrame<'_>) {
        self.ticks.push(frame.tick);
        if !frame.violations.is_empty() {
            self.violations.push((frame.tick, frame.violations.len()));
        }
    }

    fn on_skip(&mut self, tick: u64, _error: &ProcwatchError) {
        self.skipped.push(tick);
    }

    fn wait(&mut self, timeout: Duration, shutdown: &SignalHandler) -> Wake {
        if self
            .interrupt_after
            .is_some_and(|limit| self.ticks.len() >= limit)
        {
            return Wake::Interrupted;
        }
        sleep_until_shutdown(timeout, shutdown)
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
