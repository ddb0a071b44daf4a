//! Views that render the sampling loop.
//!
//! # Submodules
//!
//! - [`console`] - One status line per sample on stdout
//! - [`chart`] - Live terminal chart using ratatui

pub mod chart;
pub mod console;

pub use chart::ChartView;
pub use console::ConsoleView;

use crate::output::print_warning;
use crate::session::TickView;

/// Picks the view for a run.
///
/// The chart needs an interactive terminal; when it cannot be set up the
/// run continues with console output.
pub fn select_view(live_chart: bool) -> Box<dyn TickView> {
    if live_chart {
        match ChartView::try_new() {
            Ok(view) => return Box::new(view),
            Err(e) => print_warning(&format!(
                "Live chart unavailable ({}), falling back to console output",
                e
            )),
        }
    }
    Box::new(ConsoleView::new())
}
