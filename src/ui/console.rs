//! Line-oriented console view.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crate::error::ProcwatchError;
use crate::output::colors::*;
use crate::report::render_line;
use crate::session::{sleep_until_shutdown, TickFrame, TickView, Wake};
use crate::signal::SignalHandler;

/// Prints a status line per sample, followed by any violation warnings.
pub struct ConsoleView<W: Write = Stdout> {
    out: W,
    color: bool,
}

impl ConsoleView<Stdout> {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            color: true,
        }
    }
}

impl Default for ConsoleView<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ConsoleView<W> {
    /// Writes plain text to `out` instead of stdout.
    pub fn with_writer(out: W) -> Self {
        Self { out, color: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, color: &'static str, text: &str) -> String {
        if self.color {
            format!("{color}{}{RESET}", text)
        } else {
            text.to_string()
        }
    }

    fn emit(&mut self, line: &str) {
        // A closed stdout must not stop the run; the report is still written.
        if writeln!(self.out, "{}", line).is_err() {
            tracing::debug!("console output closed");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            tracing::debug!(error = %e, "console flush failed");
        }
    }
}

impl<W: Write> TickView for ConsoleView<W> {
    fn on_tick(&mut self, frame: &TickFrame<'_>) {
        let line = render_line(frame.sample, frame.history);
        self.emit(&line);
        for violation in frame.violations {
            let label = self.paint(YELLOW, "WARNING:");
            self.emit(&format!("{} {}", label, violation));
        }
        self.flush();
    }

    fn on_skip(&mut self, tick: u64, error: &ProcwatchError) {
        let line = self.paint(GRAY, &format!("tick {} skipped: {}", tick, error));
        self.emit(&line);
        self.flush();
    }

    fn wait(&mut self, timeout: Duration, shutdown: &SignalHandler) -> Wake {
        sleep_until_shutdown(timeout, shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::metrics::Metric;
    use crate::test_utils::cpu_samples;
    use crate::threshold::{evaluate, Thresholds};

    fn output(view: ConsoleView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn test_on_tick_prints_status_and_warnings() {
        let samples = cpu_samples(&[40.0]);
        let mut history = History::new(10);
        history.record_sample(&samples[0]);
        let thresholds = Thresholds::default();
        let violations = evaluate(&samples[0], &thresholds);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].metric, Metric::Cpu);

        let mut view = ConsoleView::with_writer(Vec::new());
        view.on_tick(&TickFrame {
            tick: 0,
            sample: &samples[0],
            history: &history,
            thresholds: &thresholds,
            violations: &violations,
        });

        let text = output(view);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("CPU:   40.0%"));
        assert_eq!(lines[1], "WARNING: High CPU: 40.0% > 25.0%");
    }

    /// Keeps written bytes but refuses to flush.
    struct UnflushableWriter(Vec<u8>);

    impl Write for UnflushableWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_flush_failure_does_not_interrupt_output() {
        let samples = cpu_samples(&[5.0, 6.0]);
        let mut history = History::new(10);
        history.record_sample(&samples[0]);
        let thresholds = Thresholds::none();

        let mut view = ConsoleView::with_writer(UnflushableWriter(Vec::new()));
        view.on_tick(&TickFrame {
            tick: 0,
            sample: &samples[0],
            history: &history,
            thresholds: &thresholds,
            violations: &[],
        });
        view.on_skip(1, &ProcwatchError::AccessDenied(12));

        let text = String::from_utf8(view.into_inner().0).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("tick 1 skipped:"));
    }

    #[test]
    fn test_on_skip_prints_reason() {
        let mut view = ConsoleView::with_writer(Vec::new());
        view.on_skip(7, &ProcwatchError::AccessDenied(12));
        let text = output(view);
        assert!(text.starts_with("tick 7 skipped:"));
    }

    #[test]
    fn test_wait_returns_on_shutdown() {
        let mut view = ConsoleView::with_writer(Vec::new());
        let shutdown = SignalHandler::detached();
        shutdown.request_shutdown();
        assert_eq!(
            view.wait(Duration::from_secs(5), &shutdown),
            Wake::Interrupted
        );
    }
}
