// Domain errors - Error types for the pipeline domain layer

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Classification of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Input exceeds a configured ceiling (file size or frame count)
    ResourceTooLarge,
    /// Video duration is missing, non-finite or non-positive
    InvalidDuration,
    /// A single seek did not settle in time
    SeekTimeout,
    /// A frame could not be rasterized after a seek
    DecodeError,
    /// Zero samples were handed to the request builder
    EmptySampleSet,
    /// The analysis service failed or was unreachable
    AnalysisServiceError,
    /// The analysis payload was absent or did not match the schema
    MalformedResponse,
    /// The run was cancelled by the caller
    Cancelled,
    /// The overall run deadline elapsed
    RunTimeout,
    /// `start` was invoked while another run was active
    AlreadyRunning,
}

impl ErrorKind {
    /// Stable identifier, matching the variant name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ResourceTooLarge => "ResourceTooLarge",
            ErrorKind::InvalidDuration => "InvalidDuration",
            ErrorKind::SeekTimeout => "SeekTimeout",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::EmptySampleSet => "EmptySampleSet",
            ErrorKind::AnalysisServiceError => "AnalysisServiceError",
            ErrorKind::MalformedResponse => "MalformedResponse",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::RunTimeout => "RunTimeout",
            ErrorKind::AlreadyRunning => "AlreadyRunning",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified pipeline failure carrying a message suitable for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DomainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn resource_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceTooLarge, message)
    }

    pub fn invalid_duration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidDuration, message)
    }

    pub fn seek_timeout(timestamp: f64, limit: Duration) -> Self {
        Self::new(
            ErrorKind::SeekTimeout,
            format!(
                "Seek to {:.3}s did not settle within {} ms",
                timestamp,
                limit.as_millis()
            ),
        )
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeError, message)
    }

    pub fn empty_sample_set() -> Self {
        Self::new(
            ErrorKind::EmptySampleSet,
            "Refusing to build an analysis request with zero frame samples",
        )
    }

    pub fn analysis_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AnalysisServiceError, message)
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    pub fn run_timeout(limit: Duration) -> Self {
        Self::new(
            ErrorKind::RunTimeout,
            format!("Analysis run exceeded {} ms", limit.as_millis()),
        )
    }

    pub fn already_running() -> Self {
        Self::new(
            ErrorKind::AlreadyRunning,
            "An analysis run is already in progress",
        )
    }

    /// Whether the failure was requested by the caller
    pub fn is_cancellation(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DomainError {}
