//! Terminal output formatting for procwatch.
//!
//! Functions are organized by domain:
//!
//! - [`banner`] - Section banners framing the start and end of a run
//! - [`messages`] - Error, warning, and info messages
//! - [`summary`] - Target details and the end-of-run summary table

pub mod banner;
pub mod messages;
pub mod summary;

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

// Re-export colors at module level for convenience
pub use colors::*;

pub use banner::{print_banner, print_footer, BannerColor};
pub use messages::{print_error, print_info, print_interrupted, print_persisted, print_warning};
pub use summary::{print_child_exit, print_summary, print_target};
