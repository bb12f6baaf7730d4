//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Number of frames to sample
    #[arg(short = 'n', long)]
    pub frames: Option<usize>,

    /// Title passed to the analysis (default: input file name)
    #[arg(short, long)]
    pub label: Option<String>,

    /// Write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the sampled frames into this directory
    #[arg(long)]
    pub frames_dir: Option<PathBuf>,
}

/// Arguments for the sample command
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Number of frames to sample
    #[arg(short = 'n', long)]
    pub frames: Option<usize>,

    /// Directory receiving the JPEG files
    #[arg(short, long)]
    pub out_dir: PathBuf,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Video duration in seconds
    #[arg(short, long, allow_negative_numbers = true)]
    pub duration: f64,

    /// Number of frames to sample
    #[arg(short = 'n', long)]
    pub frames: Option<usize>,
}
