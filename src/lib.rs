//! Cinemetrics
//!
//! Samples evenly spaced frames from a video, sends them to a multimodal
//! analysis service, and assembles a structured cinematographic report
//! (shots, average shot length, colour palette, inferred audio mood).
//!
//! # Usage
//!
//! ```bash
//! cinemetrics analyze --input film.mp4 --frames 16 --output report.json
//! cinemetrics sample --input film.mp4 --frames 8 --out-dir frames/
//! cinemetrics plan --duration 30 --frames 4
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{PipelineOrchestrator, PipelineSettings};
pub use domain::errors::{DomainError, ErrorKind};
pub use domain::model::{AnalysisResult, FrameSample, PipelineEvent, PipelineState, RunRequest};
pub use error::{CinemetricsError, CinemetricsResult};

/// Initialize the media backend. Safe to call more than once.
pub fn init() -> CinemetricsResult<()> {
    ffmpeg_next::init().map_err(|e| CinemetricsError::FFmpegInitError {
        message: e.to_string(),
    })?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);

    Ok(())
}
