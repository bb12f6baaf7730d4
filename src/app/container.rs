use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::adapters::toml_config::{AppConfig, PipelineConfig};
use crate::adapters::{GeminiAnalysisAdapter, LibavVideoSource, RasterSettings};
use crate::app::pipeline_orchestrator::{PipelineOrchestrator, PipelineSettings};
use crate::domain::rules::ProgressBudget;
use crate::engine::FrameSampler;
use crate::error::CinemetricsResult;
use crate::ports::{AnalysisPort, VideoSourcePort};

pub trait AppContainer: Send + Sync {
    fn config(&self) -> &AppConfig;
    fn orchestrator(&self) -> CinemetricsResult<Arc<PipelineOrchestrator>>;
    fn sampler(&self) -> FrameSampler;
    fn open_video(&self, path: &Path) -> CinemetricsResult<Box<dyn VideoSourcePort>>;
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            max_frame_count: config.max_frame_count,
            seek_timeout: Duration::from_millis(config.seek_timeout_ms),
            run_timeout: Duration::from_millis(config.run_timeout_ms),
            progress_budget: ProgressBudget::default(),
        }
    }
}

/// Wires adapters into the orchestrator from the effective configuration.
///
/// The analysis client is built on first use so commands that never reach
/// the service work without credentials.
pub struct DefaultAppContainer {
    config: AppConfig,
    analysis: Option<Arc<dyn AnalysisPort>>,
    orchestrator: OnceLock<Arc<PipelineOrchestrator>>,
}

impl DefaultAppContainer {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            analysis: None,
            orchestrator: OnceLock::new(),
        }
    }

    /// Use a specific analysis port instead of the configured service
    pub fn with_analysis(config: AppConfig, analysis: Arc<dyn AnalysisPort>) -> Self {
        Self {
            config,
            analysis: Some(analysis),
            orchestrator: OnceLock::new(),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings::from(&self.config.pipeline)
    }

    pub fn raster_settings(&self) -> RasterSettings {
        RasterSettings::from(&self.config.raster)
    }

    fn analysis_port(&self) -> CinemetricsResult<Arc<dyn AnalysisPort>> {
        match &self.analysis {
            Some(port) => Ok(Arc::clone(port)),
            None => Ok(Arc::new(GeminiAnalysisAdapter::new(&self.config.analysis)?)),
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn config(&self) -> &AppConfig {
        &self.config
    }

    fn orchestrator(&self) -> CinemetricsResult<Arc<PipelineOrchestrator>> {
        if let Some(orchestrator) = self.orchestrator.get() {
            return Ok(Arc::clone(orchestrator));
        }
        let built = Arc::new(PipelineOrchestrator::new(
            self.analysis_port()?,
            self.pipeline_settings(),
        ));
        Ok(Arc::clone(self.orchestrator.get_or_init(|| built)))
    }

    fn sampler(&self) -> FrameSampler {
        FrameSampler::new(Duration::from_millis(self.config.pipeline.seek_timeout_ms))
    }

    fn open_video(&self, path: &Path) -> CinemetricsResult<Box<dyn VideoSourcePort>> {
        Ok(Box::new(LibavVideoSource::open(path, self.raster_settings())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::model::AnalysisRequest;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl AnalysisPort for Unreachable {
        async fn analyze(&self, _request: &AnalysisRequest) -> Result<String, DomainError> {
            Err(DomainError::analysis_service("unreachable"))
        }

        fn service_name(&self) -> &str {
            "unreachable"
        }
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = AppConfig::default();
        config.pipeline.seek_timeout_ms = 250;
        config.pipeline.max_file_size_bytes = 10;
        let container = DefaultAppContainer::new(config);

        let settings = container.pipeline_settings();
        assert_eq!(settings.seek_timeout, Duration::from_millis(250));
        assert_eq!(settings.max_file_size_bytes, 10);
        assert_eq!(container.sampler().seek_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_orchestrator_requires_credentials() {
        let container = DefaultAppContainer::new(AppConfig::default());
        assert!(container.orchestrator().is_err());
    }

    #[test]
    fn test_orchestrator_is_shared() {
        let container =
            DefaultAppContainer::with_analysis(AppConfig::default(), Arc::new(Unreachable));
        let first = container.orchestrator().unwrap();
        let second = container.orchestrator().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
