//! CLI module for Cinemetrics
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{AnalyzeArgs, PlanArgs, SampleArgs};

/// Cinemetrics film analysis pipeline
///
/// Samples evenly spaced frames from a video and asks a multimodal model for
/// shot structure, pacing, colour palette and inferred audio mood.
#[derive(Parser, Debug)]
#[command(name = "cinemetrics")]
#[command(about = "Cinemetrics - Frame sampling and film analysis")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (overrides config and environment)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file (default: cinemetrics.toml or config/cinemetrics.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline and print the analysis report
    Analyze(AnalyzeArgs),
    /// Capture frames only and write them as JPEG files
    Sample(SampleArgs),
    /// Print the sampling timestamps for a duration
    Plan(PlanArgs),
    /// Print the effective configuration
    Config,
}

impl Commands {
    /// Frame count requested on the command line, if any
    pub fn frame_count(&self) -> Option<usize> {
        match self {
            Commands::Analyze(args) => args.frames,
            Commands::Sample(args) => args.frames,
            Commands::Plan(args) => args.frames,
            Commands::Config => None,
        }
    }
}
