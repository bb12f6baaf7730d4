// Ports - Interface definitions (contracts)

use crate::domain::errors::*;
use crate::domain::model::*;
use async_trait::async_trait;

/// Port for a decodable video source with a single playhead.
///
/// The sampler is the only caller while a run is active; it borrows the
/// source mutably, so seeks can never overlap.
#[async_trait]
pub trait VideoSourcePort: Send + Sync {
    /// Duration in seconds, `None` when the container does not report one
    fn duration_seconds(&self) -> Option<f64>;

    /// Intrinsic frame size as `(width, height)`
    fn dimensions(&self) -> (u32, u32);

    /// Move the playhead and resolve once the frame at (or nearest to)
    /// `time_seconds` is ready to be rasterized
    async fn seek_to(&mut self, time_seconds: f64) -> Result<(), DomainError>;

    /// Encode the frame currently under the playhead
    fn rasterize(&mut self) -> Result<Vec<u8>, DomainError>;

    /// Release the decoding resource. Must be idempotent.
    fn release(&mut self);

    /// Whether the decoding resource has been released
    fn is_released(&self) -> bool;

    /// Snapshot of the intrinsic properties, if a duration is known
    fn properties(&self) -> Option<VideoProperties> {
        let (width, height) = self.dimensions();
        self.duration_seconds().map(|duration_seconds| VideoProperties {
            duration_seconds,
            width,
            height,
        })
    }
}

/// Port for the external multimodal analysis service
#[async_trait]
pub trait AnalysisPort: Send + Sync {
    /// Send the request and return the raw structured payload text
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, DomainError>;

    /// Human-readable name of the backing service, used in logs
    fn service_name(&self) -> &str;
}
