//! procwatch CLI entry point.
//!
//! Parses command-line arguments, loads the config file, sets up logging and
//! dispatches to the appropriate command handler.

use clap::Parser;
use procwatch::cli::{Cli, Commands, ConfigAction};
use procwatch::commands::{
    config_display_command, config_reset_command, config_set_command, exec_command,
    watch_command, EXEC_OUTPUT_PATH,
};
use procwatch::completion::{detect_shell, print_completion_script, ShellType};
use procwatch::config::{load_config, Config, MonitorConfig, Overrides};
use procwatch::error::Result;
use procwatch::output::{print_error, print_warning};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Install the stderr log subscriber.
///
/// Logging is switched off while the live chart owns the terminal.
fn init_logging(verbose: bool, live_chart: bool) {
    let level = if live_chart {
        LevelFilter::OFF
    } else if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// Load the config file, falling back to defaults with a warning.
fn file_config() -> Config {
    match load_config() {
        Ok(config) => config,
        Err(e) => {
            print_warning(&format!("{}. Using default settings.", e));
            Config::default()
        }
    }
}

fn monitor_config(verbose: bool, overrides: &Overrides) -> Result<MonitorConfig> {
    let config = MonitorConfig::resolve(&file_config(), overrides)?;
    init_logging(verbose, config.live_chart);
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        None => {
            let config = monitor_config(cli.verbose, &cli.watch.overrides())?;
            watch_command(&config)
        }

        Some(Commands::Watch(args)) => {
            let config = monitor_config(cli.verbose, &args.overrides())?;
            watch_command(&config)
        }

        Some(Commands::Exec { run, command }) => {
            let mut overrides = run.overrides();
            overrides
                .output_path
                .get_or_insert_with(|| PathBuf::from(EXEC_OUTPUT_PATH));
            let config = monitor_config(cli.verbose, &overrides)?;
            exec_command(&config, &command)
        }

        Some(Commands::Config { action }) => {
            init_logging(cli.verbose, false);
            match action {
                None => config_display_command(),
                Some(ConfigAction::Set { key, value }) => config_set_command(&key, &value),
                Some(ConfigAction::Reset) => config_reset_command(),
            }
        }

        Some(Commands::Completions { shell }) => {
            let shell = match shell {
                Some(name) => ShellType::from_name(&name)?,
                None => detect_shell()?,
            };
            print_completion_script(shell);
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
