// Adapters - External system implementations

pub mod analysis_gemini;
pub mod toml_config;
pub mod video_libav;

// Re-export adapters
pub use analysis_gemini::GeminiAnalysisAdapter;
pub use toml_config::{AppConfig, TomlConfigAdapter};
pub use video_libav::{LibavVideoSource, RasterSettings};
