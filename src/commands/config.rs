//! Config command handler.
//!
//! Displays, modifies, and resets the procwatch configuration file.

use crate::config::{
    config_path, load_config_at, save_config_at, set_config_value, Config,
};
use crate::error::{ProcwatchError, Result};
use crate::output::{BOLD, GRAY, GREEN, RESET};
use std::path::Path;

/// Display the configuration file path and its effective values.
///
/// Creates the file with defaults if it does not exist yet.
pub fn config_display_command() -> Result<()> {
    let path = config_path()?;
    let config = load_config_at(&path)?;
    println!("{BOLD}# procwatch config{RESET}");
    println!("{GRAY}# {}{RESET}", path.display());
    println!();
    print!("{}", config_to_toml_string(&config)?);
    Ok(())
}

/// Set one key in the configuration file.
pub fn config_set_command(key: &str, value: &str) -> Result<()> {
    let path = config_path()?;
    set_value_at(&path, key, value)?;
    println!("{GREEN}Set{RESET} {} = {}", key, value);
    Ok(())
}

/// Overwrite the configuration file with defaults.
pub fn config_reset_command() -> Result<()> {
    let path = config_path()?;
    save_config_at(&Config::default(), &path)?;
    println!("{GREEN}Config reset to defaults:{RESET} {}", path.display());
    Ok(())
}

fn set_value_at(path: &Path, key: &str, value: &str) -> Result<Config> {
    let mut config = load_config_at(path)?;
    set_config_value(&mut config, key, value)?;
    save_config_at(&config, path)?;
    Ok(config)
}

/// Render a config as TOML.
pub fn config_to_toml_string(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| ProcwatchError::Config(e.to_string()))
}
