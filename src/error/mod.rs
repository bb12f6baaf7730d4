//! Error handling module for Cinemetrics

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for Cinemetrics operations outside the pipeline core
#[derive(Error, Debug)]
pub enum CinemetricsError {
    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInitError { message: String },

    /// The input could not be opened as a video
    #[error("Failed to open video {path}: {message}")]
    OpenError { path: String, message: String },

    /// Analysis client could not be constructed
    #[error("Failed to set up analysis client: {message}")]
    ClientError { message: String },

    /// Report or frame output error
    #[error("Failed to write output: {message}")]
    OutputError { message: String },

    /// Classified pipeline failure
    #[error(transparent)]
    Pipeline(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CinemetricsError {
    pub fn config(message: impl Into<String>) -> Self {
        CinemetricsError::ConfigError {
            message: message.into(),
        }
    }
}

/// Result type alias for Cinemetrics operations
pub type CinemetricsResult<T> = std::result::Result<T, CinemetricsError>;
