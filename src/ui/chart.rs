//! Live terminal chart.
//!
//! Draws CPU, memory and thread count over time with their limits, plus the
//! latest status line and recent violations. The view owns the wait between
//! ticks so keyboard input is handled on the sampling thread.

use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, Paragraph},
    Frame, Terminal,
};
use tracing::debug;

use crate::error::{ProcwatchError, Result};
use crate::metrics::{Metric, Sample};
use crate::process::ProcessInfo;
use crate::report::render_line;
use crate::session::{sleep_until_shutdown, TickFrame, TickView, Wake};
use crate::signal::SignalHandler;
use crate::threshold::Thresholds;

/// Cyan - headers and the measured series
const COLOR_PRIMARY: Color = Color::Cyan;
/// Yellow - limits and violations
const COLOR_WARNING: Color = Color::Yellow;
/// Gray - secondary text
const COLOR_DIM: Color = Color::DarkGray;

/// Metrics that get a chart panel.
const CHARTED: [Metric; 3] = [Metric::Cpu, Metric::Memory, Metric::Threads];

/// Points kept per chart.
const CHART_WINDOW: usize = 120;

/// Violation messages kept in the side pane.
const RECENT_VIOLATIONS: usize = 8;

/// Upper bound on a single input poll, so a shutdown from another thread is
/// seen even while no key is pressed.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Everything the chart draws. Independent of the terminal so it can be
/// rendered against any backend.
#[derive(Debug, Default)]
pub struct ChartState {
    process: Option<ProcessInfo>,
    thresholds: Option<Thresholds>,
    series: [VecDeque<(f64, f64)>; 3],
    latest: Option<Sample>,
    status_line: String,
    samples: u64,
    skipped: u64,
    violations: VecDeque<String>,
    started: Option<Instant>,
}

impl ChartState {
    pub fn start(&mut self, process: &ProcessInfo, thresholds: &Thresholds) {
        self.process = Some(process.clone());
        self.thresholds = Some(thresholds.clone());
        self.started = Some(Instant::now());
    }

    pub fn push(&mut self, frame: &TickFrame<'_>) {
        let x = frame.tick as f64;
        for (points, metric) in self.series.iter_mut().zip(CHARTED) {
            if points.len() == CHART_WINDOW {
                points.pop_front();
            }
            points.push_back((x, metric.value(frame.sample)));
        }

        for violation in frame.violations {
            if self.violations.len() == RECENT_VIOLATIONS {
                self.violations.pop_front();
            }
            self.violations
                .push_back(format!("#{} {}", frame.tick, violation));
        }

        self.status_line = render_line(frame.sample, frame.history);
        self.latest = Some(frame.sample.clone());
        self.samples = frame.history.total_recorded();
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn points(&self, metric: Metric) -> &VecDeque<(f64, f64)> {
        let index = CHARTED.iter().position(|m| *m == metric).unwrap_or(0);
        &self.series[index]
    }

    pub fn violations(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.violations.iter().map(String::as_str)
    }

    fn limit(&self, metric: Metric) -> Option<f64> {
        self.thresholds.as_ref().and_then(|t| t.limit(metric))
    }

    /// X range covering the retained points, at least one unit wide.
    fn x_bounds(&self) -> [f64; 2] {
        let points = &self.series[0];
        let first = points.front().map_or(0.0, |p| p.0);
        let last = points.back().map_or(0.0, |p| p.0);
        [first, last.max(first + 1.0)]
    }

    /// Y range from zero to just above the larger of the peak and the limit.
    fn y_bounds(&self, metric: Metric) -> [f64; 2] {
        let peak = self
            .points(metric)
            .iter()
            .map(|p| p.1)
            .fold(0.0_f64, f64::max);
        let top = peak.max(self.limit(metric).unwrap_or(0.0));
        [0.0, if top > 0.0 { top * 1.1 } else { 1.0 }]
    }
}

/// Renders the whole screen.
pub fn render(frame: &mut Frame, state: &ChartState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Process header
            Constraint::Min(9),    // Charts and violations
            Constraint::Length(1), // Latest status line
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
        .split(chunks[1]);

    let panels = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(body[0]);
    for (area, metric) in panels.iter().zip(CHARTED) {
        render_metric(frame, *area, state, metric);
    }
    render_violations(frame, body[1], state);

    frame.render_widget(
        Paragraph::new(state.status_line.as_str()).style(Style::default().fg(Color::White)),
        chunks[2],
    );
    frame.render_widget(
        Paragraph::new(" q/Esc: stop monitoring and write report ")
            .style(Style::default().fg(COLOR_DIM)),
        chunks[3],
    );
}

fn render_header(frame: &mut Frame, area: Rect, state: &ChartState) {
    let (name, pid) = state
        .process
        .as_ref()
        .map_or(("-", 0), |p| (p.name.as_str(), p.pid));
    let elapsed = state.started.map_or(0, |s| s.elapsed().as_secs());

    let mut spans = vec![
        Span::styled(
            name.to_string(),
            Style::default()
                .fg(COLOR_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  pid {}", pid), Style::default().fg(COLOR_DIM)),
        Span::raw(format!("  samples {}  elapsed {}s", state.samples, elapsed)),
    ];
    if state.skipped > 0 {
        spans.push(Span::styled(
            format!("  skipped {}", state.skipped),
            Style::default().fg(COLOR_WARNING),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" procwatch ")
            .border_style(Style::default().fg(COLOR_PRIMARY)),
    );
    frame.render_widget(header, area);
}

fn render_metric(frame: &mut Frame, area: Rect, state: &ChartState, metric: Metric) {
    let points: Vec<(f64, f64)> = state.points(metric).iter().copied().collect();
    let [x_min, x_max] = state.x_bounds();
    let [y_min, y_max] = state.y_bounds(metric);
    let limit = state.limit(metric);
    let limit_line = limit.map(|l| vec![(x_min, l), (x_max, l)]);

    let latest = state
        .latest
        .as_ref()
        .map(|s| metric.format_value(metric.value(s)))
        .unwrap_or_else(|| "-".to_string());
    let over = matches!(
        (limit, state.latest.as_ref()),
        (Some(l), Some(s)) if metric.value(s) > l
    );
    let mut title = format!(" {} {} ", metric.label(), latest);
    if let Some(l) = limit {
        title.push_str(&format!("(limit {}) ", metric.format_value(l)));
    }

    let mut datasets = vec![Dataset::default()
        .name(metric.label())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(COLOR_PRIMARY))
        .data(&points)];
    if let Some(line) = &limit_line {
        datasets.push(
            Dataset::default()
                .name("limit")
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(COLOR_WARNING))
                .data(line),
        );
    }

    let border = if over { COLOR_WARNING } else { COLOR_DIM };
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(border)),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(COLOR_DIM))
                .bounds([x_min, x_max]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(COLOR_DIM))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(metric.format_value(y_min)),
                    Span::raw(metric.format_value(y_max)),
                ]),
        );
    frame.render_widget(chart, area);
}

fn render_violations(frame: &mut Frame, area: Rect, state: &ChartState) {
    let items: Vec<ListItem> = if state.violations.is_empty() {
        vec![ListItem::new(Span::styled(
            "none",
            Style::default().fg(COLOR_DIM),
        ))]
    } else {
        state
            .violations()
            .rev()
            .map(|v| ListItem::new(Span::styled(v.to_string(), Style::default().fg(COLOR_WARNING))))
            .collect()
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Violations ")
            .border_style(Style::default().fg(COLOR_DIM)),
    );
    frame.render_widget(list, area);
}

/// Keys that end the run: `q`, `Esc`, and `Ctrl+C` (raw mode swallows SIGINT).
pub fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Initialize the terminal for chart mode.
fn init_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e);
    }
    Terminal::new(CrosstermBackend::new(stdout))
}

/// Restore the terminal to normal mode.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Full-screen chart view.
pub struct ChartView {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: ChartState,
    restored: bool,
}

impl ChartView {
    /// Switches the terminal to the alternate screen.
    ///
    /// # Errors
    ///
    /// Fails when stdout is not an interactive terminal.
    pub fn try_new() -> Result<Self> {
        let terminal = init_terminal().map_err(ProcwatchError::Io)?;

        // Set up panic hook to restore terminal on panic
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        Ok(Self {
            terminal,
            state: ChartState::default(),
            restored: false,
        })
    }

    fn draw(&mut self) {
        let state = &self.state;
        if let Err(e) = self.terminal.draw(|frame| render(frame, state)) {
            debug!(error = %e, "chart draw failed");
        }
    }

    fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        if let Err(e) = restore_terminal(&mut self.terminal) {
            debug!(error = %e, "could not restore terminal");
        }
    }
}

impl TickView for ChartView {
    fn start(&mut self, process: &ProcessInfo, thresholds: &Thresholds) {
        self.state.start(process, thresholds);
        self.draw();
    }

    fn on_tick(&mut self, frame: &TickFrame<'_>) {
        self.state.push(frame);
        self.draw();
    }

    fn on_skip(&mut self, _tick: u64, _error: &ProcwatchError) {
        self.state.skip();
        self.draw();
    }

    fn wait(&mut self, timeout: Duration, shutdown: &SignalHandler) -> Wake {
        let deadline = Instant::now() + timeout;
        loop {
            if shutdown.is_shutdown_requested() {
                return Wake::Interrupted;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Wake::Elapsed;
            }

            match event::poll(remaining.min(POLL_SLICE)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press && is_quit_key(&key) => {
                        shutdown.request_shutdown();
                        return Wake::Interrupted;
                    }
                    // ratatui picks up the new size on the next draw
                    Ok(Event::Resize(_, _)) => self.draw(),
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "failed to read terminal event"),
                },
                Ok(false) => {}
                Err(e) => {
                    debug!(error = %e, "terminal input unavailable");
                    return sleep_until_shutdown(remaining, shutdown);
                }
            }
        }
    }

    fn finish(&mut self) {
        self.restore();
    }
}

impl Drop for ChartView {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::test_utils::{cpu_samples, test_process};
    use crate::threshold::evaluate;
    use ratatui::backend::TestBackend;

    fn feed(state: &mut ChartState, values: &[f64], thresholds: &Thresholds) -> History {
        let mut history = History::new(100);
        for (tick, sample) in cpu_samples(values).iter().enumerate() {
            history.record_sample(sample);
            let violations = evaluate(sample, thresholds);
            state.push(&TickFrame {
                tick: tick as u64,
                sample,
                history: &history,
                thresholds,
                violations: &violations,
            });
        }
        history
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_push_tracks_series_and_violations() {
        let thresholds = Thresholds::default();
        let mut state = ChartState::default();
        state.start(&test_process(), &thresholds);
        feed(&mut state, &[10.0, 30.0, 5.0, 40.0], &thresholds);

        let cpu: Vec<f64> = state.points(Metric::Cpu).iter().map(|p| p.1).collect();
        assert_eq!(cpu, vec![10.0, 30.0, 5.0, 40.0]);
        let mem = state.points(Metric::Memory).back().unwrap().1;
        assert_eq!(mem, 64.0);

        let violations: Vec<&str> = state.violations().collect();
        assert_eq!(violations.len(), 2);
        assert!(violations[0].starts_with("#1 High CPU"));
        assert!(violations[1].starts_with("#3 High CPU"));
        assert_eq!(state.samples, 4);
    }

    #[test]
    fn test_series_window_is_bounded() {
        let thresholds = Thresholds::none();
        let mut state = ChartState::default();
        let values: Vec<f64> = (0..CHART_WINDOW + 10).map(|v| v as f64).collect();
        feed(&mut state, &values, &thresholds);

        let points = state.points(Metric::Cpu);
        assert_eq!(points.len(), CHART_WINDOW);
        assert_eq!(points.front().unwrap().0, 10.0);
        assert_eq!(state.x_bounds(), [10.0, (CHART_WINDOW + 9) as f64]);
    }

    #[test]
    fn test_y_bounds_include_limit() {
        let thresholds = Thresholds::default();
        let mut state = ChartState::default();
        state.start(&test_process(), &thresholds);
        feed(&mut state, &[10.0], &thresholds);

        let [low, high] = state.y_bounds(Metric::Cpu);
        assert_eq!(low, 0.0);
        assert!((high - 27.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_state_bounds() {
        let state = ChartState::default();
        assert_eq!(state.x_bounds(), [0.0, 1.0]);
        assert_eq!(state.y_bounds(Metric::Threads), [0.0, 1.0]);
    }

    #[test]
    fn test_render_shows_process_and_violations() {
        let thresholds = Thresholds::default();
        let mut state = ChartState::default();
        state.start(&test_process(), &thresholds);
        feed(&mut state, &[10.0, 30.0], &thresholds);
        state.skip();

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(frame, &state)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("procwatch"));
        assert!(text.contains("rusty-audio"));
        assert!(text.contains("skipped 1"));
        assert!(text.contains("Violations"));
        assert!(text.contains("#1 High CPU"));
    }

    #[test]
    fn test_render_lists_newest_violation_first() {
        let thresholds = Thresholds::default();
        let mut state = ChartState::default();
        state.start(&test_process(), &thresholds);
        feed(&mut state, &[10.0, 30.0, 5.0, 40.0], &thresholds);

        let newest_first: Vec<&str> = state.violations().rev().collect();
        assert!(newest_first[0].starts_with("#3 High CPU"));

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(frame, &state)).unwrap();
        let text = buffer_text(&terminal);
        let newest = text.find("#3 High CPU").unwrap();
        let oldest = text.find("#1 High CPU").unwrap();
        assert!(newest < oldest);
    }

    #[test]
    fn test_render_before_first_sample() {
        let state = ChartState::default();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(frame, &state)).unwrap();
        assert!(buffer_text(&terminal).contains("none"));
    }

    #[test]
    fn test_quit_keys() {
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    }
}
