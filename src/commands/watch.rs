//! Watch command handler.
//!
//! Resolves the target, runs the sampling loop in the selected view, then
//! prints the summary and writes the report on every exit path.

use crate::config::MonitorConfig;
use crate::error::{ProcwatchError, Result};
use crate::output::{print_error, print_interrupted, print_persisted, print_summary, print_target};
use crate::process::{
    Capabilities, MetricSampler, ProcessMonitor, ProcessResolver, SystemResolver, Target,
};
use crate::report::persist;
use crate::session::{MonitorSession, Report, RunLimits, TickView};
use crate::signal::SignalHandler;
use crate::state::StopReason;
use crate::ui::select_view;
use tracing::{info, warn};

/// What a finished run produced.
pub struct RunOutcome {
    pub reason: StopReason,
    pub report: Report,
    /// Whether the report file was written.
    pub persisted: bool,
}

/// Picks the target from the effective config. An explicit pid wins over a
/// pattern.
pub fn target_for(config: &MonitorConfig) -> Result<Target> {
    match (config.pid, &config.target_pattern) {
        (Some(pid), _) => Ok(Target::Pid(pid)),
        (None, Some(pattern)) => Ok(Target::Pattern(pattern.clone())),
        (None, None) => Err(ProcwatchError::InvalidArgument(
            "No target process given. Use --pid or --name, \
             or set target_pattern in the config file."
                .to_string(),
        )),
    }
}

/// Monitor an already running process.
///
/// # Errors
///
/// Fails before sampling starts when no target is configured, the target
/// cannot be resolved, or the Ctrl+C handler cannot be installed. Once
/// sampling has started the run always completes and writes its report.
pub fn watch_command(config: &MonitorConfig) -> Result<()> {
    let target = target_for(config)?;
    let shutdown = SignalHandler::new()?;
    let resolver = SystemResolver::new();
    watch_with(&resolver, &target, config, &shutdown)?;
    Ok(())
}

fn watch_with(
    resolver: &dyn ProcessResolver,
    target: &Target,
    config: &MonitorConfig,
    shutdown: &SignalHandler,
) -> Result<RunOutcome> {
    let mut session = MonitorSession::resolve(
        resolver,
        target,
        config.thresholds.clone(),
        config.history_capacity,
    )?;
    let mut sampler = ProcessMonitor::new(session.process().pid);
    print_target(session.process(), config, sampler.capabilities());

    let mut view = select_view(config.live_chart);
    run_session(&mut session, &mut sampler, view.as_mut(), shutdown, config);
    drop(view);

    Ok(finalize_run(&session, sampler.capabilities(), config))
}

/// Runs the sampling loop and releases the view.
pub fn run_session<S, V>(
    session: &mut MonitorSession,
    sampler: &mut S,
    view: &mut V,
    shutdown: &SignalHandler,
    config: &MonitorConfig,
) -> StopReason
where
    S: MetricSampler + ?Sized,
    V: TickView + ?Sized,
{
    let limits = RunLimits::from_config(config.interval_seconds, config.duration_seconds);
    let reason = session.run(sampler, view, shutdown, limits);
    view.finish();
    if reason == StopReason::UserInterrupt {
        print_interrupted();
    }
    reason
}

/// Prints the summary and writes the report.
///
/// A write failure is reported to the user and recorded in the outcome; it
/// does not turn the run into an error.
pub fn finalize_run(
    session: &MonitorSession,
    capabilities: Capabilities,
    config: &MonitorConfig,
) -> RunOutcome {
    let report = session.report(capabilities, config.interval_seconds);
    print_summary(report.summary.as_ref(), &report.snapshot);

    let persisted = match persist(&report.snapshot, &config.output_path) {
        Ok(()) => {
            info!(path = %config.output_path.display(), "report written");
            print_persisted(&config.output_path);
            true
        }
        Err(e) => {
            warn!(error = %e, "report not written");
            print_error(&e.to_string());
            false
        }
    };

    RunOutcome {
        reason: session
            .state()
            .stop_reason()
            .unwrap_or(StopReason::ProcessExited),
        report,
        persisted,
    }
}
