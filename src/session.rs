//! The monitoring session and its sampling loop.
//!
//! A [`MonitorSession`] is created once the target process has been
//! resolved. [`MonitorSession::run`] then repeats
//! sample → record → evaluate → render on a fixed cadence until the duration
//! elapses, the user interrupts, or the process goes away. The loop never
//! returns an error: every exit path yields a [`StopReason`], and the caller
//! always proceeds to [`MonitorSession::report`].

use crate::config::MAX_INTERVAL_SECONDS;
use crate::error::{ProcwatchError, Result};
use crate::history::History;
use crate::metrics::Sample;
use crate::process::{Capabilities, MetricSampler, ProcessInfo, ProcessResolver, Target};
use crate::report::{summarize, RunContext, Snapshot, Summary};
use crate::signal::SignalHandler;
use crate::state::{RunRecord, RunState, StopReason};
use crate::threshold::{evaluate, Thresholds, Violation};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long the loop may run and how often it samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLimits {
    pub interval: Duration,
    /// `None` runs until interrupted or the process exits.
    pub duration: Option<Duration>,
}

impl RunLimits {
    /// Builds limits from config units; a duration of 0 means unbounded.
    ///
    /// Intervals too large for a [`Duration`] are clamped to
    /// [`MAX_INTERVAL_SECONDS`].
    pub fn from_config(interval_seconds: f64, duration_seconds: u64) -> Self {
        let interval = Duration::try_from_secs_f64(interval_seconds.max(0.0))
            .unwrap_or(Duration::from_secs_f64(MAX_INTERVAL_SECONDS));
        Self {
            interval,
            duration: (duration_seconds > 0).then(|| Duration::from_secs(duration_seconds)),
        }
    }
}

/// Why a wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Elapsed,
    Interrupted,
}

/// Everything a view needs to render one tick.
pub struct TickFrame<'a> {
    /// Zero-based index of this sample within the run.
    pub tick: u64,
    pub sample: &'a Sample,
    pub history: &'a History,
    pub thresholds: &'a Thresholds,
    pub violations: &'a [Violation],
}

/// A consumer of the sampling loop's output.
///
/// The view also owns the wait between ticks, so an interactive view can
/// keep handling input on the same thread without a second timer.
pub trait TickView {
    fn start(&mut self, _process: &ProcessInfo, _thresholds: &Thresholds) {}

    fn on_tick(&mut self, frame: &TickFrame<'_>);

    fn on_skip(&mut self, tick: u64, error: &ProcwatchError);

    /// Blocks for up to `timeout`, returning early once shutdown is requested.
    fn wait(&mut self, timeout: Duration, shutdown: &SignalHandler) -> Wake;

    /// Releases anything the view holds (e.g. the terminal).
    fn finish(&mut self) {}
}

/// Sleeps in short slices so a shutdown request is noticed promptly.
pub fn sleep_until_shutdown(timeout: Duration, shutdown: &SignalHandler) -> Wake {
    const SLICE: Duration = Duration::from_millis(50);
    // An unrepresentable deadline means wait until shutdown.
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if shutdown.is_shutdown_requested() {
            return Wake::Interrupted;
        }
        let now = Instant::now();
        let remaining = match deadline {
            Some(deadline) if now >= deadline => return Wake::Elapsed,
            Some(deadline) => deadline - now,
            None => SLICE,
        };
        std::thread::sleep(SLICE.min(remaining));
    }
}

/// Result of finalizing a session.
pub struct Report {
    /// `None` when the run recorded no samples.
    pub summary: Option<Summary>,
    pub snapshot: Snapshot,
}

/// One run against one process.
pub struct MonitorSession {
    process: ProcessInfo,
    history: History,
    thresholds: Thresholds,
    record: RunRecord,
}

impl MonitorSession {
    pub fn new(process: ProcessInfo, thresholds: Thresholds, capacity: usize) -> Self {
        let mut record = RunRecord::new();
        record.transition_to(RunState::Sampling);
        Self {
            process,
            history: History::new(capacity),
            thresholds,
            record,
        }
    }

    /// Resolves `target` and creates a session for it.
    ///
    /// # Errors
    ///
    /// Fails with [`ProcwatchError::ProcessNotFound`] when nothing matches.
    pub fn resolve(
        resolver: &dyn ProcessResolver,
        target: &Target,
        thresholds: Thresholds,
        capacity: usize,
    ) -> Result<Self> {
        let process = resolver.resolve(target)?;
        info!(pid = process.pid, name = %process.name, "resolved target process");
        Ok(Self::new(process, thresholds, capacity))
    }

    pub fn process(&self) -> &ProcessInfo {
        &self.process
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    pub fn state(&self) -> RunState {
        self.record.state
    }

    /// Runs the sampling loop until a stop condition is reached.
    pub fn run<S, V>(
        &mut self,
        sampler: &mut S,
        view: &mut V,
        shutdown: &SignalHandler,
        limits: RunLimits,
    ) -> StopReason
    where
        S: MetricSampler + ?Sized,
        V: TickView + ?Sized,
    {
        view.start(&self.process, &self.thresholds);
        // A duration past the end of the clock is treated as unbounded.
        let deadline = limits.duration.and_then(|d| Instant::now().checked_add(d));

        let reason = loop {
            if shutdown.is_shutdown_requested() {
                break StopReason::UserInterrupt;
            }

            let tick_started = Instant::now();
            if let Err(e) = self.tick(sampler, view) {
                debug!(error = %e, "sampling stopped");
                break StopReason::ProcessExited;
            }

            let now = Instant::now();
            let mut next_tick = tick_started.checked_add(limits.interval);
            if let Some(deadline) = deadline {
                if now >= deadline {
                    break StopReason::DurationElapsed;
                }
                next_tick = Some(next_tick.map_or(deadline, |t| t.min(deadline)));
            }
            let timeout = match next_tick {
                Some(t) => t.saturating_duration_since(now),
                None => limits.interval,
            };

            if view.wait(timeout, shutdown) == Wake::Interrupted {
                break StopReason::UserInterrupt;
            }
        };

        self.stop(reason);
        reason
    }

    /// Takes and records one sample.
    ///
    /// Recoverable sampling errors are logged, counted and swallowed; any
    /// other error means the process is gone and is returned.
    pub fn tick<S, V>(&mut self, sampler: &mut S, view: &mut V) -> Result<()>
    where
        S: MetricSampler + ?Sized,
        V: TickView + ?Sized,
    {
        let tick = self.record.ticks;
        self.record.ticks += 1;

        match sampler.sample() {
            Ok(sample) => {
                self.history.record_sample(&sample);
                let violations = evaluate(&sample, &self.thresholds);
                view.on_tick(&TickFrame {
                    tick: self.history.total_recorded() - 1,
                    sample: &sample,
                    history: &self.history,
                    thresholds: &self.thresholds,
                    violations: &violations,
                });
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                self.record.skipped_ticks += 1;
                warn!(tick, error = %e, "skipping tick");
                view.on_skip(tick, &e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Marks the run as stopped. Later calls keep the first reason.
    pub fn stop(&mut self, reason: StopReason) {
        self.record.transition_to(RunState::Stopped(reason));
        info!(
            reason = reason.describe(),
            samples = self.history.total_recorded(),
            "monitoring stopped"
        );
    }

    /// Summarizes the run and builds its snapshot.
    ///
    /// A run without samples yields `summary: None` and an empty snapshot.
    pub fn report(&self, capabilities: Capabilities, interval_seconds: f64) -> Report {
        let summary = match summarize(&self.history, &self.thresholds) {
            Ok(summary) => Some(summary),
            Err(ProcwatchError::EmptyHistory) => None,
            Err(e) => {
                warn!(error = %e, "could not summarize run");
                None
            }
        };

        let ctx = RunContext {
            process: &self.process,
            record: &self.record,
            thresholds: &self.thresholds,
            capabilities,
            interval_seconds,
            history_capacity: self.history.capacity(),
        };
        let snapshot = Snapshot::build(&ctx, summary.as_ref());
        Report { summary, snapshot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;
    use crate::report::persist;
    use crate::test_utils::{
        cpu_samples, test_process, FakeResolver, FakeSampler, RecordingView, SampleStep,
    };
    use tempfile::TempDir;

    fn unbounded() -> RunLimits {
        RunLimits {
            interval: Duration::ZERO,
            duration: None,
        }
    }

    fn session(thresholds: Thresholds) -> MonitorSession {
        MonitorSession::new(test_process(), thresholds, 100)
    }

    #[test]
    fn test_run_limits_from_config() {
        let limits = RunLimits::from_config(0.5, 0);
        assert_eq!(limits.interval, Duration::from_millis(500));
        assert_eq!(limits.duration, None);

        let limits = RunLimits::from_config(1.0, 30);
        assert_eq!(limits.duration, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_run_limits_clamp_huge_interval() {
        let limits = RunLimits::from_config(1e20, u64::MAX);
        assert_eq!(limits.interval, Duration::from_secs(86_400));
        assert_eq!(limits.duration, Some(Duration::from_secs(u64::MAX)));
    }

    #[test]
    fn test_resolve_creates_sampling_session() {
        let resolver = FakeResolver::with(test_process());
        let session = MonitorSession::resolve(
            &resolver,
            &Target::Pattern("rusty".to_string()),
            Thresholds::default(),
            10,
        )
        .unwrap();
        assert_eq!(session.state(), RunState::Sampling);
        assert_eq!(session.process().name, "rusty-audio");
        assert_eq!(session.history().capacity(), 10);
    }

    #[test]
    fn test_resolve_missing_process_is_fatal() {
        let resolver = FakeResolver::empty();
        let result = MonitorSession::resolve(
            &resolver,
            &Target::Pid(1),
            Thresholds::default(),
            10,
        );
        assert!(matches!(result, Err(ProcwatchError::ProcessNotFound(_))));
    }

    #[test]
    fn test_process_exit_at_tick_five_keeps_five_samples() {
        let mut session = session(Thresholds::default());
        let mut sampler = FakeSampler::from_samples(cpu_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        let mut view = RecordingView::default();
        let shutdown = SignalHandler::detached();

        let reason = session.run(&mut sampler, &mut view, &shutdown, unbounded());

        assert_eq!(reason, StopReason::ProcessExited);
        assert_eq!(session.state(), RunState::Stopped(StopReason::ProcessExited));
        assert_eq!(session.history().len(), 5);
        let report = session.report(Capabilities::default(), 1.0);
        assert_eq!(report.summary.unwrap().sample_count, 5);
        assert_eq!(report.snapshot.sample_count, 5);
        assert_eq!(report.snapshot.stop_reason, Some(StopReason::ProcessExited));
        assert!(view.started);
    }

    #[test]
    fn test_interrupt_before_first_tick_yields_empty_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let mut session = session(Thresholds::default());
        let mut sampler = FakeSampler::from_samples(cpu_samples(&[50.0]));
        let mut view = RecordingView::default();
        let shutdown = SignalHandler::detached();
        shutdown.request_shutdown();

        let reason = session.run(
            &mut sampler,
            &mut view,
            &shutdown,
            RunLimits::from_config(1.0, 0),
        );

        assert_eq!(reason, StopReason::UserInterrupt);
        assert!(view.ticks.is_empty());
        let report = session.report(Capabilities::default(), 1.0);
        assert!(report.summary.is_none());
        persist(&report.snapshot, &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["sample_count"], 0);
        assert_eq!(json["stop_reason"], "user_interrupt");
    }

    #[test]
    fn test_interrupt_during_wait_stops_run() {
        let mut session = session(Thresholds::default());
        let mut sampler = FakeSampler::endless(Sample::default());
        let mut view = RecordingView::interrupt_after(3);
        let shutdown = SignalHandler::detached();

        let reason = session.run(&mut sampler, &mut view, &shutdown, unbounded());

        assert_eq!(reason, StopReason::UserInterrupt);
        assert_eq!(session.history().total_recorded(), 3);
    }

    #[test]
    fn test_duration_elapsed_stops_run() {
        let mut session = session(Thresholds::default());
        let mut sampler = FakeSampler::endless(Sample::default());
        let mut view = RecordingView::default();
        let shutdown = SignalHandler::detached();
        let limits = RunLimits {
            interval: Duration::from_millis(5),
            duration: Some(Duration::from_millis(30)),
        };

        let reason = session.run(&mut sampler, &mut view, &shutdown, limits);

        assert_eq!(reason, StopReason::DurationElapsed);
        assert!(session.history().total_recorded() >= 1);
    }

    #[test]
    fn test_recoverable_errors_skip_tick_and_continue() {
        let mut session = session(Thresholds::default());
        let mut sampler = FakeSampler::new(vec![
            SampleStep::Sample(cpu_samples(&[1.0])[0].clone()),
            SampleStep::Fail(ProcwatchError::AccessDenied(4242)),
            SampleStep::Fail(ProcwatchError::ProcessUnavailable {
                pid: 4242,
                reason: "transient".to_string(),
            }),
            SampleStep::Sample(cpu_samples(&[2.0])[0].clone()),
        ]);
        let mut view = RecordingView::default();
        let shutdown = SignalHandler::detached();

        let reason = session.run(&mut sampler, &mut view, &shutdown, unbounded());

        assert_eq!(reason, StopReason::ProcessExited);
        assert_eq!(session.history().snapshot(Metric::Cpu), vec![1.0, 2.0]);
        assert_eq!(session.record().skipped_ticks, 2);
        assert_eq!(session.record().ticks, 5);
        assert_eq!(view.skipped, vec![1, 2]);
    }

    #[test]
    fn test_violations_reach_view_at_expected_ticks() {
        let thresholds = Thresholds {
            cpu_percent: Some(25.0),
            ..Thresholds::none()
        };
        let mut session = session(thresholds);
        let mut sampler = FakeSampler::from_samples(cpu_samples(&[10.0, 30.0, 5.0, 40.0]));
        let mut view = RecordingView::default();
        let shutdown = SignalHandler::detached();

        session.run(&mut sampler, &mut view, &shutdown, unbounded());

        assert_eq!(view.violation_ticks(), vec![1, 3]);
        let report = session.report(Capabilities::default(), 1.0);
        assert_eq!(report.snapshot.violations.get("cpu_exceeded"), Some(&2));
    }

    #[test]
    fn test_history_is_bounded_over_long_runs() {
        let mut session = MonitorSession::new(test_process(), Thresholds::default(), 3);
        let mut sampler = FakeSampler::from_samples(cpu_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        let mut view = RecordingView::default();
        let shutdown = SignalHandler::detached();

        session.run(&mut sampler, &mut view, &shutdown, unbounded());

        assert_eq!(session.history().snapshot(Metric::Cpu), vec![3.0, 4.0, 5.0]);
        let report = session.report(Capabilities::default(), 1.0);
        assert_eq!(report.snapshot.sample_count, 5);
        assert_eq!(report.snapshot.metrics[&Metric::Cpu].history, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_stop_keeps_first_reason() {
        let mut session = session(Thresholds::default());
        session.stop(StopReason::ProcessExited);
        session.stop(StopReason::UserInterrupt);
        assert_eq!(session.state(), RunState::Stopped(StopReason::ProcessExited));
    }

    #[test]
    fn test_sleep_until_shutdown_returns_early() {
        let shutdown = SignalHandler::detached();
        shutdown.request_shutdown();
        let started = Instant::now();
        let wake = sleep_until_shutdown(Duration::from_secs(10), &shutdown);
        assert_eq!(wake, Wake::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_sleep_until_shutdown_elapses() {
        let shutdown = SignalHandler::detached();
        assert_eq!(
            sleep_until_shutdown(Duration::from_millis(10), &shutdown),
            Wake::Elapsed
        );
    }
}
