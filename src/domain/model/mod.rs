// Domain models - Core types and data structures

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::errors::{DomainError, ErrorKind};

/// A single encoded image captured at a specific timestamp
#[derive(Clone, PartialEq)]
pub struct FrameSample {
    /// Encoded image bytes (JPEG for the libav source)
    pub encoded_image: Vec<u8>,
    /// Position of the capture in the source, in seconds
    pub timestamp_seconds: f64,
}

impl FrameSample {
    pub fn new(encoded_image: Vec<u8>, timestamp_seconds: f64) -> Self {
        Self {
            encoded_image,
            timestamp_seconds,
        }
    }

    /// Size of the encoded payload in bytes
    pub fn byte_len(&self) -> usize {
        self.encoded_image.len()
    }
}

impl fmt::Debug for FrameSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSample")
            .field("timestamp_seconds", &self.timestamp_seconds)
            .field("bytes", &self.encoded_image.len())
            .finish()
    }
}

/// Intrinsic properties of an opened video source
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoProperties {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
}

/// Samples plus metadata handed to the analysis service.
///
/// Only [`AnalysisRequestBuilder`](crate::domain::usecases::AnalysisRequestBuilder)
/// constructs requests, so a request always holds at least one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    samples: Arc<[FrameSample]>,
    source_label: String,
}

impl AnalysisRequest {
    pub(crate) fn new(samples: Arc<[FrameSample]>, source_label: String) -> Self {
        Self {
            samples,
            source_label,
        }
    }

    pub fn samples(&self) -> &[FrameSample] {
        &self.samples
    }

    /// Shared handle to the samples, used to annotate the final result
    pub fn shared_samples(&self) -> Arc<[FrameSample]> {
        Arc::clone(&self.samples)
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    /// Total encoded payload size across all samples
    pub fn payload_bytes(&self) -> usize {
        self.samples.iter().map(FrameSample::byte_len).sum()
    }
}

/// A contiguous segment of video identified by the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shot {
    #[serde(deserialize_with = "count_from_number")]
    pub id: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub description: String,
    pub colors: Vec<String>,
    pub camera_movement: String,
    pub composition: String,
}

/// Inferred audio characteristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStats {
    pub mood: String,
    pub music_description: String,
    pub dynamic_range: String,
    pub key_events: Vec<String>,
}

/// Structured film analysis produced by a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub title: String,
    /// Average shot length in seconds
    pub asl: f64,
    #[serde(deserialize_with = "count_from_number")]
    pub total_shots: u32,
    pub dominant_colors: Vec<String>,
    pub shots: Vec<Shot>,
    pub audio: AudioStats,
    pub visual_summary: String,
    /// Samples the analysis was produced from (read-only annotation)
    #[serde(skip)]
    pub frames: Option<Arc<[FrameSample]>>,
}

impl AnalysisResult {
    /// Attach the originating samples
    pub fn with_frames(mut self, frames: Arc<[FrameSample]>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.as_ref().map_or(0, |frames| frames.len())
    }

    pub fn frame_timestamps(&self) -> Vec<f64> {
        self.frames
            .as_ref()
            .map(|frames| frames.iter().map(|f| f.timestamp_seconds).collect())
            .unwrap_or_default()
    }

    /// Sum of the per-shot durations reported by the service
    pub fn covered_duration(&self) -> f64 {
        self.shots.iter().map(|shot| shot.duration).sum()
    }
}

/// Accepts integral JSON numbers written either as `4` or `4.0`
fn count_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Ok(value as u32)
    } else {
        Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, found {}",
            value
        )))
    }
}

/// Parameters of a single run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub requested_frame_count: usize,
    pub size_bytes: u64,
    pub source_label: String,
}

impl RunRequest {
    pub fn new(requested_frame_count: usize, size_bytes: u64, source_label: impl Into<String>) -> Self {
        Self {
            requested_frame_count,
            size_bytes,
            source_label: source_label.into(),
        }
    }
}

/// Lifecycle of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Validating,
    /// Share of requested samples captured so far (0-100)
    Sampling { progress: u8 },
    Requesting,
    Assembling,
    Complete(Arc<AnalysisResult>),
    Failed { kind: ErrorKind, message: String },
}

impl PipelineState {
    pub fn failed(error: &DomainError) -> Self {
        PipelineState::Failed {
            kind: error.kind,
            message: error.message.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Complete(_) | PipelineState::Failed { .. })
    }

    /// Position in the stage order; terminal states share the last rank
    pub fn rank(&self) -> u8 {
        match self {
            PipelineState::Idle => 0,
            PipelineState::Validating => 1,
            PipelineState::Sampling { .. } => 2,
            PipelineState::Requesting => 3,
            PipelineState::Assembling => 4,
            PipelineState::Complete(_) | PipelineState::Failed { .. } => 5,
        }
    }

    /// Whether moving to `next` keeps the run monotonic.
    ///
    /// Sampling may refresh its own progress but never go backwards, and
    /// any non-terminal state may fail.
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, PipelineState::Failed { .. }) => true,
            (PipelineState::Sampling { progress: a }, PipelineState::Sampling { progress: b }) => {
                b >= a
            }
            _ => next.rank() > self.rank(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Validating => "validating",
            PipelineState::Sampling { .. } => "sampling",
            PipelineState::Requesting => "requesting",
            PipelineState::Assembling => "assembling",
            PipelineState::Complete(_) => "complete",
            PipelineState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Sampling { progress } => write!(f, "sampling ({}%)", progress),
            PipelineState::Failed { kind, message } => write!(f, "failed ({}): {}", kind, message),
            other => f.write_str(other.label()),
        }
    }
}

/// Observable pipeline notification
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    State(PipelineState),
    /// Overall run progress, 0-100, non-decreasing within a run
    Progress(u8),
}

#[cfg(test)]
mod tests;
