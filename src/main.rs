//! Cinemetrics CLI
//!
//! Samples frames from a video, sends them to a multimodal model, and prints
//! a structured cinematographic analysis.
//!
//! # Usage
//!
//! ```bash
//! cinemetrics analyze --input film.mp4 --output report.json
//! cinemetrics sample --input film.mp4 --frames 8 --out-dir frames/
//! cinemetrics plan --duration 30 --frames 4
//! cinemetrics config
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use cinemetrics::app::DefaultAppContainer;
use cinemetrics::cli::{commands, Cli, Commands};
use cinemetrics::config_initialization::initialize_configuration;
use cinemetrics::utils::logging::LoggingSystem;

/// Main entry point for the Cinemetrics CLI application
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Resolve configuration before logging so the configured level applies
    let config = initialize_configuration(&cli)?;
    LoggingSystem::new(config.logging.clone()).initialize()?;

    debug!(command = ?cli.command, "starting cinemetrics");

    // Execute the requested command
    match cli.command {
        Commands::Analyze(args) => {
            cinemetrics::init()?;
            let container = DefaultAppContainer::new(config);
            commands::analyze(args, &container).await?;
        }
        Commands::Sample(args) => {
            cinemetrics::init()?;
            let container = DefaultAppContainer::new(config);
            commands::sample(args, &container).await?;
        }
        Commands::Plan(args) => commands::plan(args, &config)?,
        Commands::Config => commands::config(&config)?,
    }

    info!("done");
    Ok(())
}
