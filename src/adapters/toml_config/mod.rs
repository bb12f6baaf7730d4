// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CinemetricsError, CinemetricsResult};
use crate::utils::logging::{LogFormat, LogLevel, LoggingConfig};

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub raster: RasterConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

/// Run limits and timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Frames sampled per run
    pub frame_count: usize,
    /// Upper bound on input size
    pub max_file_size_bytes: u64,
    /// Upper bound on frames per run
    pub max_frame_count: usize,
    pub seek_timeout_ms: u64,
    pub run_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_count: 16,
            max_file_size_bytes: 100 * 1024 * 1024,
            max_frame_count: 64,
            seek_timeout_ms: 5_000,
            run_timeout_ms: 180_000,
        }
    }
}

/// Frame encoding options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RasterConfig {
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
    /// Frames wider than this are scaled down; 0 keeps the intrinsic size
    pub max_width: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 70,
            max_width: 1280,
        }
    }
}

/// Analysis service connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key: None,
            request_timeout_ms: 120_000,
        }
    }
}

/// Environment variables mapped onto configuration keys
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("CINEMETRICS_FRAME_COUNT", "pipeline.frame_count"),
    ("CINEMETRICS_MAX_FILE_SIZE", "pipeline.max_file_size_bytes"),
    ("CINEMETRICS_MAX_FRAME_COUNT", "pipeline.max_frame_count"),
    ("CINEMETRICS_SEEK_TIMEOUT_MS", "pipeline.seek_timeout_ms"),
    ("CINEMETRICS_RUN_TIMEOUT_MS", "pipeline.run_timeout_ms"),
    ("CINEMETRICS_JPEG_QUALITY", "raster.jpeg_quality"),
    ("CINEMETRICS_MAX_WIDTH", "raster.max_width"),
    ("CINEMETRICS_ENDPOINT", "analysis.endpoint"),
    ("CINEMETRICS_MODEL", "analysis.model"),
    ("CINEMETRICS_REQUEST_TIMEOUT_MS", "analysis.request_timeout_ms"),
    ("CINEMETRICS_LOG_LEVEL", "logging.level"),
    ("CINEMETRICS_LOG_FORMAT", "logging.format"),
    ("API_KEY", "analysis.api_key"),
    ("GEMINI_API_KEY", "analysis.api_key"),
];

/// Config files searched when no explicit path is given
pub const CONFIG_CANDIDATES: &[&str] = &["cinemetrics.toml", "config/cinemetrics.toml"];

/// TOML configuration adapter
#[derive(Debug, Clone, Default)]
pub struct TomlConfigAdapter {
    config: AppConfig,
    config_file_path: Option<PathBuf>,
}

impl TomlConfigAdapter {
    /// Create new TOML config adapter holding the defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn into_config(self) -> AppConfig {
        self.config
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Load configuration from file, replacing the current values
    pub fn load_config(&mut self, file_path: &Path) -> CinemetricsResult<()> {
        if !file_path.exists() {
            return Err(CinemetricsError::config(format!(
                "Config file does not exist: {}",
                file_path.display()
            )));
        }

        let content = std::fs::read_to_string(file_path)?;
        self.config = Self::deserialize_config(&content)?;
        self.config_file_path = Some(file_path.to_path_buf());
        tracing::info!(path = %file_path.display(), "loaded configuration file");
        Ok(())
    }

    /// Load the first candidate that exists under `base_dir`
    pub fn load_first_existing(&mut self, base_dir: &Path) -> CinemetricsResult<Option<PathBuf>> {
        for candidate in CONFIG_CANDIDATES {
            let path = base_dir.join(candidate);
            if path.is_file() {
                self.load_config(&path)?;
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> CinemetricsResult<usize> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup; returns how many were applied.
    ///
    /// Later entries of [`ENV_OVERRIDES`] win, so `GEMINI_API_KEY` takes
    /// precedence over `API_KEY`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> CinemetricsResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        for (env_var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(env_var).filter(|v| !v.trim().is_empty()) {
                self.set_value(key, &value)?;
                tracing::debug!(env_var, key, "applied environment override");
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Set a single value by dotted key
    pub fn set_value(&mut self, key: &str, value: &str) -> CinemetricsResult<()> {
        let config = &mut self.config;
        match key {
            "pipeline.frame_count" => config.pipeline.frame_count = parse_number(key, value)?,
            "pipeline.max_file_size_bytes" => {
                config.pipeline.max_file_size_bytes = parse_number(key, value)?
            }
            "pipeline.max_frame_count" => {
                config.pipeline.max_frame_count = parse_number(key, value)?
            }
            "pipeline.seek_timeout_ms" => {
                config.pipeline.seek_timeout_ms = parse_number(key, value)?
            }
            "pipeline.run_timeout_ms" => config.pipeline.run_timeout_ms = parse_number(key, value)?,
            "raster.jpeg_quality" => config.raster.jpeg_quality = parse_number(key, value)?,
            "raster.max_width" => config.raster.max_width = parse_number(key, value)?,
            "analysis.endpoint" => config.analysis.endpoint = value.trim().to_string(),
            "analysis.model" => config.analysis.model = value.trim().to_string(),
            "analysis.api_key" => config.analysis.api_key = Some(value.trim().to_string()),
            "analysis.request_timeout_ms" => {
                config.analysis.request_timeout_ms = parse_number(key, value)?
            }
            "logging.level" => config.logging.level = LogLevel::parse(value)?,
            "logging.format" => config.logging.format = LogFormat::parse(value)?,
            _ => {
                return Err(CinemetricsError::config(format!(
                    "Unknown configuration key: {}",
                    key
                )))
            }
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate_config(&self) -> CinemetricsResult<()> {
        let pipeline = &self.config.pipeline;
        if pipeline.frame_count == 0 {
            return Err(CinemetricsError::config("pipeline.frame_count must be at least 1"));
        }
        if pipeline.frame_count > pipeline.max_frame_count {
            return Err(CinemetricsError::config(format!(
                "pipeline.frame_count ({}) exceeds pipeline.max_frame_count ({})",
                pipeline.frame_count, pipeline.max_frame_count
            )));
        }
        if pipeline.seek_timeout_ms == 0 || pipeline.run_timeout_ms == 0 {
            return Err(CinemetricsError::config("pipeline timeouts must be non-zero"));
        }

        let quality = self.config.raster.jpeg_quality;
        if !(1..=100).contains(&quality) {
            return Err(CinemetricsError::config(format!(
                "raster.jpeg_quality must be between 1 and 100, got {}",
                quality
            )));
        }

        let analysis = &self.config.analysis;
        if analysis.endpoint.is_empty() || analysis.model.is_empty() {
            return Err(CinemetricsError::config(
                "analysis.endpoint and analysis.model must be set",
            ));
        }
        if analysis.request_timeout_ms == 0 {
            return Err(CinemetricsError::config("analysis.request_timeout_ms must be non-zero"));
        }

        Ok(())
    }

    /// Serialize config to a TOML string with secrets masked
    pub fn serialize_config(&self) -> CinemetricsResult<String> {
        let mut printable = self.config.clone();
        if printable.analysis.api_key.is_some() {
            printable.analysis.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&printable)
            .map_err(|e| CinemetricsError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Deserialize config from TOML string
    pub fn deserialize_config(toml_content: &str) -> CinemetricsResult<AppConfig> {
        toml::from_str(toml_content)
            .map_err(|e| CinemetricsError::config(format!("Failed to parse TOML config: {}", e)))
    }
}

fn parse_number<T>(key: &str, value: &str) -> CinemetricsResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        CinemetricsError::config(format!("Invalid value for {}: {} ({})", key, value, e))
    })
}
