//! Shell completion scripts for procwatch.
//!
//! Scripts are generated from the [`Cli`](crate::cli::Cli) definition, so
//! every flag and subcommand the binary accepts is completed.
//!
//! # Usage
//!
//! ```ignore
//! use procwatch::completion::{detect_shell, generate_completion_script};
//!
//! let shell = detect_shell()?;
//! let script = generate_completion_script(shell);
//! ```

use crate::cli::Cli;
use crate::error::{ProcwatchError, Result};
use clap::CommandFactory;
use clap_complete::{generate, Shell};

/// Names accepted by [`ShellType::from_name`].
pub const SUPPORTED_SHELLS: &[&str] = &["bash", "zsh", "fish"];

/// Supported shell types for completion scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

impl ShellType {
    /// Convert to the `clap_complete::Shell` type.
    pub fn to_clap_shell(self) -> Shell {
        match self {
            ShellType::Bash => Shell::Bash,
            ShellType::Zsh => Shell::Zsh,
            ShellType::Fish => Shell::Fish,
        }
    }

    /// Get the display name of the shell.
    pub fn name(&self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
        }
    }

    /// Parse a shell from its name, case-insensitively.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bash" => Ok(ShellType::Bash),
            "zsh" => Ok(ShellType::Zsh),
            "fish" => Ok(ShellType::Fish),
            _ => Err(ProcwatchError::InvalidArgument(format!(
                "Unsupported shell: '{}'. Supported shells are: {}.",
                name,
                SUPPORTED_SHELLS.join(", ")
            ))),
        }
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the user's shell from the `$SHELL` environment variable.
///
/// # Errors
///
/// Fails if `$SHELL` is not set or names an unsupported shell.
pub fn detect_shell() -> Result<ShellType> {
    let shell_path = std::env::var("SHELL").map_err(|_| {
        ProcwatchError::InvalidArgument(
            "$SHELL environment variable is not set. Please specify your shell.".to_string(),
        )
    })?;
    parse_shell_from_path(&shell_path)
}

/// Parse a shell type from a shell path such as `/usr/bin/zsh`.
pub fn parse_shell_from_path(shell_path: &str) -> Result<ShellType> {
    let shell_name = std::path::Path::new(shell_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(shell_path);
    ShellType::from_name(shell_name)
}

/// Generate a completion script for the specified shell.
pub fn generate_completion_script(shell: ShellType) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    generate(shell.to_clap_shell(), &mut cmd, "procwatch", &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

/// Print a completion script to stdout.
pub fn print_completion_script(shell: ShellType) {
    print!("{}", generate_completion_script(shell));
}
