//! Configuration initialization and hierarchy management

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::adapters::toml_config::{AppConfig, TomlConfigAdapter};
use crate::cli::Cli;

/// Build the effective configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration(cli: &Cli) -> Result<AppConfig> {
    let base_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    initialize_configuration_with(cli, &base_dir, |name| std::env::var(name).ok())
}

/// Same as [`initialize_configuration`] with an explicit search directory and
/// environment lookup
pub fn initialize_configuration_with<F>(cli: &Cli, base_dir: &Path, env: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    // Step 1: defaults
    let mut adapter = TomlConfigAdapter::new();

    // Step 2: file
    match &cli.config {
        Some(path) => adapter
            .load_config(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => {
            if adapter.load_first_existing(base_dir)?.is_none() {
                debug!("No configuration file found, using defaults");
            }
        }
    }

    // Step 3: environment
    let env_overrides = adapter
        .apply_overrides_from(env)
        .context("Invalid environment override")?;

    // Step 4: command line
    let cli_overrides = apply_cli_overrides(&mut adapter, cli)?;

    adapter
        .validate_config()
        .context("Invalid configuration")?;

    info!(
        file = ?adapter.config_file_path(),
        env_overrides,
        cli_overrides,
        "configuration initialized"
    );
    Ok(adapter.into_config())
}

fn apply_cli_overrides(adapter: &mut TomlConfigAdapter, cli: &Cli) -> Result<usize> {
    let mut applied = 0;

    if let Some(level) = &cli.log_level {
        adapter.set_value("logging.level", level)?;
        applied += 1;
    }
    if let Some(frames) = cli.command.frame_count() {
        adapter.set_value("pipeline.frame_count", &frames.to_string())?;
        applied += 1;
    }

    Ok(applied)
}
