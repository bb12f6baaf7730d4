// Domain use cases - Analysis request packaging

use std::sync::Arc;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Packages captured samples into the analysis service contract
pub struct AnalysisRequestBuilder;

impl AnalysisRequestBuilder {
    /// Build the request for one run; a zero-frame request is never produced
    pub fn build(
        samples: impl Into<Arc<[FrameSample]>>,
        source_label: &str,
    ) -> Result<AnalysisRequest, DomainError> {
        let samples = samples.into();
        if samples.is_empty() {
            return Err(DomainError::empty_sample_set());
        }

        let label = source_label.trim();
        let label = if label.is_empty() { "untitled" } else { label };

        Ok(AnalysisRequest::new(samples, label.to_string()))
    }
}
