//! Command implementations

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::toml_config::TomlConfigAdapter;
use crate::adapters::AppConfig;
use crate::app::container::AppContainer;
use crate::app::PipelineOrchestrator;
use crate::cli::args::{AnalyzeArgs, PlanArgs, SampleArgs};
use crate::domain::model::{PipelineEvent, RunRequest};
use crate::domain::rules::SamplingPlan;
use crate::error::CinemetricsError;
use crate::output::{ReportWriter, RunReport};
use crate::utils::Utils;

/// Execute the analyze command
pub async fn analyze(args: AnalyzeArgs, container: &dyn AppContainer) -> Result<()> {
    let size_bytes = input_size(&args.input)?;
    let label = args.label.clone().unwrap_or_else(|| source_label(&args.input));
    let frame_count = container.config().pipeline.frame_count;

    info!(
        input = %args.input.display(),
        size = %Utils::format_file_size(size_bytes),
        frames = frame_count,
        "starting analyze"
    );

    let orchestrator = container.orchestrator()?;
    let request = RunRequest::new(frame_count, size_bytes, label.clone());
    orchestrator
        .validate(&request)
        .map_err(CinemetricsError::from)
        .context("Analysis failed")?;

    let mut video = container
        .open_video(&args.input)
        .context("Failed to open input video")?;

    let progress_log = spawn_progress_logger(&orchestrator);
    let interrupt = spawn_interrupt_handler(Arc::clone(&orchestrator));

    let started_at = Utc::now();
    let clock = Instant::now();
    let outcome = orchestrator
        .start(video.as_mut(), request)
        .await;

    interrupt.abort();
    progress_log.abort();

    let result = outcome.map_err(CinemetricsError::from).context("Analysis failed")?;
    let report = RunReport::new(label, started_at, clock.elapsed(), (*result).clone());

    let writer = ReportWriter::new();
    if let Some(dir) = &args.frames_dir {
        if let Some(frames) = &result.frames {
            writer
                .write_frames(frames, dir)
                .context("Failed to write frames")?;
        }
    }
    if let Some(path) = &args.output {
        writer
            .write_report(&report, path)
            .context("Failed to write report")?;
    }

    println!("{}", report.to_json()?);
    info!(
        elapsed = %Utils::format_duration(clock.elapsed()),
        shots = report.analysis.shots.len(),
        "analyze completed"
    );
    Ok(())
}

/// Execute the sample command
pub async fn sample(args: SampleArgs, container: &dyn AppContainer) -> Result<()> {
    input_size(&args.input)?;
    let frame_count = container.config().pipeline.frame_count;
    info!(input = %args.input.display(), frames = frame_count, "starting sample");

    let mut video = container
        .open_video(&args.input)
        .context("Failed to open input video")?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        })
    };

    let sampler = container.sampler();
    let outcome = sampler
        .sample_with_progress(video.as_mut(), frame_count, &cancel, |captured, total| {
            info!(captured, total, "frame captured");
        })
        .await;
    interrupt.abort();

    let frames = outcome
        .map_err(CinemetricsError::from)
        .context("Sampling failed")?;
    let written = ReportWriter::new()
        .write_frames(&frames, &args.out_dir)
        .context("Failed to write frames")?;

    for (frame, path) in frames.iter().zip(&written) {
        println!(
            "{}\t{}",
            Utils::format_timestamp(frame.timestamp_seconds),
            path.display()
        );
    }
    Ok(())
}

/// Execute the plan command
pub fn plan(args: PlanArgs, config: &AppConfig) -> Result<()> {
    let count = config.pipeline.frame_count;
    let timestamps = SamplingPlan::timestamps(args.duration, count)
        .map_err(CinemetricsError::from)
        .context("Cannot plan sampling")?;

    for (index, timestamp) in timestamps.iter().enumerate() {
        println!(
            "{:>3}  {:>10.3}s  {}",
            index + 1,
            timestamp,
            Utils::format_timestamp(*timestamp)
        );
    }
    Ok(())
}

/// Execute the config command
pub fn config(config: &AppConfig) -> Result<()> {
    let mut adapter = TomlConfigAdapter::new();
    *adapter.config_mut() = config.clone();
    print!("{}", adapter.serialize_config()?);
    Ok(())
}

fn input_size(path: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(path).map_err(|_| CinemetricsError::InputFileNotFound {
        path: path.display().to_string(),
    })?;
    if !metadata.is_file() {
        return Err(CinemetricsError::InputFileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    Ok(metadata.len())
}

fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn spawn_progress_logger(orchestrator: &PipelineOrchestrator) -> JoinHandle<()> {
    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                PipelineEvent::Progress(percent) => info!(percent, "progress"),
                PipelineEvent::State(state) => info!(state = %state, "state changed"),
            }
        }
    })
}

fn spawn_interrupt_handler(orchestrator: Arc<PipelineOrchestrator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            orchestrator.cancel();
        }
    })
}
