// Application layer - Pipeline orchestration and wiring

pub mod container;
pub mod pipeline_orchestrator;

// Re-export application services
pub use container::{AppContainer, DefaultAppContainer};
pub use pipeline_orchestrator::{PipelineOrchestrator, PipelineSettings};
