//! Report and frame file writing

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::model::{AnalysisResult, FrameSample};
use crate::error::{CinemetricsError, CinemetricsResult};

/// Run metadata plus the analysis, as written to disk and stdout
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub frame_count: usize,
    pub frame_timestamps: Vec<f64>,
    pub analysis: AnalysisResult,
}

impl RunReport {
    pub fn new(
        source: impl Into<String>,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        analysis: AnalysisResult,
    ) -> Self {
        Self {
            source: source.into(),
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: elapsed.as_millis() as u64,
            frame_count: analysis.frame_count(),
            frame_timestamps: analysis.frame_timestamps(),
            analysis,
        }
    }

    pub fn to_json(&self) -> CinemetricsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// File name for the `index`-th (zero-based) sampled frame
pub fn frame_file_name(index: usize, timestamp_seconds: f64) -> String {
    format!("frame_{:02}_{:.2}s.jpg", index + 1, timestamp_seconds)
}

/// Writes reports and frames, replacing files atomically
#[derive(Debug, Clone)]
pub struct ReportWriter {
    overwrite: bool,
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

impl ReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to replace existing files
    pub fn no_overwrite(mut self) -> Self {
        self.overwrite = false;
        self
    }

    /// Write the JSON report to `path`
    pub fn write_report(&self, report: &RunReport, path: &Path) -> CinemetricsResult<()> {
        let json = report.to_json()?;
        self.write_atomic(path, json.as_bytes())?;
        info!(path = %path.display(), frames = report.frame_count, "report written");
        Ok(())
    }

    /// Write every frame as a JPEG under `dir`; returns the written paths
    pub fn write_frames(&self, frames: &[FrameSample], dir: &Path) -> CinemetricsResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(|e| CinemetricsError::OutputError {
            message: format!("Failed to create {}: {}", dir.display(), e),
        })?;

        let mut written = Vec::with_capacity(frames.len());
        for (index, frame) in frames.iter().enumerate() {
            let path = dir.join(frame_file_name(index, frame.timestamp_seconds));
            self.write_atomic(&path, &frame.encoded_image)?;
            debug!(path = %path.display(), bytes = frame.byte_len(), "frame written");
            written.push(path);
        }

        info!(dir = %dir.display(), count = written.len(), "frames written");
        Ok(written)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> CinemetricsResult<()> {
        if path.exists() && !self.overwrite {
            return Err(CinemetricsError::OutputError {
                message: format!("Refusing to overwrite {}", path.display()),
            });
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file_name = path.file_name().ok_or_else(|| CinemetricsError::OutputError {
            message: format!("Invalid output path: {}", path.display()),
        })?;
        let temp_path = path.with_file_name(format!(".tmp_{}", file_name.to_string_lossy()));

        let written = Self::write_temp(&temp_path, data).and_then(|()| {
            std::fs::rename(&temp_path, path).map_err(|e| CinemetricsError::OutputError {
                message: format!("Failed to move output into place: {}", e),
            })
        });
        if written.is_err() {
            let _ = std::fs::remove_file(&temp_path);
        }
        written
    }

    fn write_temp(temp_path: &Path, data: &[u8]) -> CinemetricsResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(data)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}
