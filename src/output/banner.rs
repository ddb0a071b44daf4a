//! Section banners.
//!
//! Frames the monitoring output with a `━━━ TITLE ━━━` line sized to the
//! terminal.

use terminal_size::{terminal_size, Width};

use super::colors::*;

const DEFAULT_TERMINAL_WIDTH: u16 = 80;
const MIN_BANNER_WIDTH: usize = 20;
const MAX_BANNER_WIDTH: usize = 80;

/// Color options for banners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BannerColor {
    /// Cyan - monitoring started
    Cyan,
    /// Green - run finished without violations
    Green,
    /// Yellow - run finished with violations
    Yellow,
}

impl BannerColor {
    /// Get the ANSI color code for this banner color.
    pub fn ansi_code(&self) -> &'static str {
        match self {
            BannerColor::Cyan => CYAN,
            BannerColor::Green => GREEN,
            BannerColor::Yellow => YELLOW,
        }
    }
}

fn banner_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH as usize)
        .clamp(MIN_BANNER_WIDTH, MAX_BANNER_WIDTH)
}

/// Builds the uncolored banner text for `title` at `width` columns.
fn banner_line(title: &str, width: usize) -> String {
    let title = format!(" {} ", title);
    let remaining = width.saturating_sub(title.chars().count());
    let left = remaining / 2;
    let right = remaining - left;
    format!("{}{}{}", "━".repeat(left), title, "━".repeat(right))
}

/// Print a color-coded banner with a centered title.
pub fn print_banner(title: &str, color: BannerColor) {
    println!(
        "{}{BOLD}{}{RESET}",
        color.ansi_code(),
        banner_line(title, banner_width())
    );
}

/// Print a plain rule closing the section opened by [`print_banner`].
pub fn print_footer(color: BannerColor) {
    println!(
        "{}{BOLD}{}{RESET}",
        color.ansi_code(),
        "━".repeat(banner_width())
    );
}
