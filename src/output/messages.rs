//! Basic message output functions.
//!
//! Errors and warnings go to stderr so they never mix with status lines
//! piped from stdout.

use std::path::Path;

use super::colors::*;

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{RED}{BOLD}Error:{RESET} {}", msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{YELLOW}Warning:{RESET} {}", msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{CYAN}Info:{RESET} {}", msg);
}

/// Print interruption message when the user presses Ctrl+C.
pub fn print_interrupted() {
    println!();
    println!("{YELLOW}Interrupted.{RESET} Writing report...");
}

/// Print where the report was written.
pub fn print_persisted(path: &Path) {
    println!("{GREEN}Report saved:{RESET} {}", path.display());
}
