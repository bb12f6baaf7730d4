//! Deterministic frame sampling over a single-playhead video source

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::FrameSample;
use crate::domain::rules::SamplingPlan;
use crate::ports::VideoSourcePort;

/// Holds the source for the duration of sampling and releases the decoding
/// resource on every exit path, including when the sampling future is dropped.
struct SourceLease<'a> {
    source: &'a mut dyn VideoSourcePort,
}

impl<'a> SourceLease<'a> {
    fn new(source: &'a mut dyn VideoSourcePort) -> Self {
        Self { source }
    }
}

impl Drop for SourceLease<'_> {
    fn drop(&mut self) {
        if !self.source.is_released() {
            self.source.release();
            debug!("video source released");
        }
    }
}

/// Captures evenly spaced interior frames, one seek at a time
#[derive(Debug, Clone)]
pub struct FrameSampler {
    seek_timeout: Duration,
}

impl FrameSampler {
    pub fn new(seek_timeout: Duration) -> Self {
        Self { seek_timeout }
    }

    pub fn seek_timeout(&self) -> Duration {
        self.seek_timeout
    }

    /// Sample `count` frames without cancellation or progress reporting
    pub async fn sample(
        &self,
        source: &mut dyn VideoSourcePort,
        count: usize,
    ) -> Result<Vec<FrameSample>, DomainError> {
        let token = CancellationToken::new();
        self.sample_with_progress(source, count, &token, |_, _| {})
            .await
    }

    /// Sample `count` frames, reporting `(captured, total)` after each capture.
    ///
    /// Cancellation is observed before each seek and while a seek is pending.
    /// The source is released when this returns or is dropped.
    pub async fn sample_with_progress<F>(
        &self,
        source: &mut dyn VideoSourcePort,
        count: usize,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<Vec<FrameSample>, DomainError>
    where
        F: FnMut(usize, usize) + Send,
    {
        let mut lease = SourceLease::new(source);

        let duration = lease.source.duration_seconds().ok_or_else(|| {
            DomainError::invalid_duration("Video duration is unavailable")
        })?;
        let timestamps = SamplingPlan::timestamps(duration, count)?;

        let (width, height) = lease.source.dimensions();
        if count > 0 && (width == 0 || height == 0) {
            return Err(DomainError::decode(format!(
                "Video reports no intrinsic frame size ({}x{})",
                width, height
            )));
        }

        info!(
            duration_seconds = duration,
            width,
            height,
            count,
            "sampling frames"
        );

        let mut samples = Vec::with_capacity(count);
        for (index, &timestamp) in timestamps.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(captured = samples.len(), count, "sampling cancelled");
                return Err(DomainError::cancelled(format!(
                    "Sampling cancelled after {} of {} frames",
                    samples.len(),
                    count
                )));
            }

            self.seek(&mut *lease.source, timestamp, cancel).await?;

            let encoded_image = lease.source.rasterize().map_err(|e| {
                DomainError::decode(format!(
                    "Frame {} at {:.3}s could not be rasterized: {}",
                    index + 1,
                    timestamp,
                    e.message
                ))
            })?;

            debug!(
                index = index + 1,
                timestamp,
                bytes = encoded_image.len(),
                "captured frame"
            );
            samples.push(FrameSample::new(encoded_image, timestamp));
            on_progress(samples.len(), count);
        }

        drop(lease);
        Ok(samples)
    }

    async fn seek(
        &self,
        source: &mut dyn VideoSourcePort,
        timestamp: f64,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DomainError::cancelled(format!(
                "Sampling cancelled while seeking to {:.3}s",
                timestamp
            ))),
            settled = tokio::time::timeout(self.seek_timeout, source.seek_to(timestamp)) => {
                match settled {
                    Ok(result) => result,
                    Err(_) => Err(DomainError::seek_timeout(timestamp, self.seek_timeout)),
                }
            }
        }
    }
}
