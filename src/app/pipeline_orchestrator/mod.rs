// Pipeline orchestrator - Drives validate, sample, request and assemble stages

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::{ProgressBudget, ResponseSchema};
use crate::domain::usecases::AnalysisRequestBuilder;
use crate::engine::{FrameSampler, ProgressTracker};
use crate::ports::*;

/// Limits and timings applied to every run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Largest accepted input, checked before any decoding work
    pub max_file_size_bytes: u64,
    /// Largest accepted frame count per run
    pub max_frame_count: usize,
    /// Bound on each individual seek
    pub seek_timeout: Duration,
    /// Bound on the whole run, including the analysis call
    pub run_timeout: Duration,
    pub progress_budget: ProgressBudget,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 100 * 1024 * 1024,
            max_frame_count: 64,
            seek_timeout: Duration::from_secs(5),
            run_timeout: Duration::from_secs(180),
            progress_budget: ProgressBudget::default(),
        }
    }
}

/// Runs one analysis at a time and exposes its state and progress
pub struct PipelineOrchestrator {
    analysis: Arc<dyn AnalysisPort>,
    settings: PipelineSettings,
    sampler: FrameSampler,
    state: watch::Sender<PipelineState>,
    progress: ProgressTracker,
    active_run: Mutex<Option<CancellationToken>>,
    runs: AtomicU64,
}

/// Clears the active-run slot when a run ends, however it ends
struct ActiveRun<'a> {
    orchestrator: &'a PipelineOrchestrator,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        let orchestrator = self.orchestrator;
        if !orchestrator.state().is_terminal() {
            // The run future was dropped before reaching a terminal state
            orchestrator.transition(PipelineState::Failed {
                kind: ErrorKind::Cancelled,
                message: "Run abandoned before completion".to_string(),
            });
        }
        orchestrator.active_slot().take();
    }
}

impl PipelineOrchestrator {
    /// Create new orchestrator with an injected analysis port
    pub fn new(analysis: Arc<dyn AnalysisPort>, settings: PipelineSettings) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        let sampler = FrameSampler::new(settings.seek_timeout);

        Self {
            analysis,
            settings,
            sampler,
            state,
            progress: ProgressTracker::new(),
            active_run: Mutex::new(None),
            runs: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Current state snapshot
    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Receiver that always holds the latest state
    pub fn watch_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Stream of every state transition and progress advance
    pub fn subscribe(&self) -> UnboundedReceiver<PipelineEvent> {
        self.progress.subscribe()
    }

    /// Last published overall progress (0-100)
    pub fn progress(&self) -> u8 {
        self.progress.percent()
    }

    pub fn is_running(&self) -> bool {
        self.active_slot().is_some()
    }

    /// Run the full pipeline against `video`.
    ///
    /// Fails with `AlreadyRunning` if another run is active on this
    /// orchestrator; that run is left untouched. Any other failure is
    /// terminal for the run and leaves the state at `Failed`.
    pub async fn start(
        &self,
        video: &mut dyn VideoSourcePort,
        request: RunRequest,
    ) -> Result<Arc<AnalysisResult>, DomainError> {
        let token = self.begin_run()?;
        let guard = ActiveRun { orchestrator: self };

        let run_id = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let span = info_span!(
            "pipeline_run",
            run_id,
            label = %request.source_label,
            started_at = %chrono::Utc::now().to_rfc3339()
        );

        let run_timeout = self.settings.run_timeout;
        let outcome = async {
            info!(
                frames = request.requested_frame_count,
                size_bytes = request.size_bytes,
                "starting analysis run"
            );
            match tokio::time::timeout(run_timeout, self.run_stages(video, &request, &token)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(DomainError::run_timeout(run_timeout)),
            }
        }
        .instrument(span)
        .await;

        let outcome = match outcome {
            Ok(result) => {
                self.progress.advance_to(ProgressBudget::COMPLETE);
                self.transition(PipelineState::Complete(Arc::clone(&result)));
                info!(
                    run_id,
                    elapsed_ms = self.progress.elapsed().as_millis() as u64,
                    shots = result.shots.len(),
                    "analysis run complete"
                );
                Ok(result)
            }
            Err(error) => {
                warn!(run_id, kind = %error.kind, message = %error.message, "analysis run failed");
                self.transition(PipelineState::failed(&error));
                Err(error)
            }
        };

        drop(guard);
        outcome
    }

    /// Request cooperative cancellation of the active run.
    ///
    /// Takes effect at the next seek completion or at the analysis call.
    /// Returns `false` when no run is active.
    pub fn cancel(&self) -> bool {
        match self.active_slot().as_ref() {
            Some(token) => {
                if !token.is_cancelled() {
                    info!("cancellation requested");
                    token.cancel();
                }
                true
            }
            None => false,
        }
    }

    fn active_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_run(&self) -> Result<CancellationToken, DomainError> {
        let token = {
            let mut slot = self.active_slot();
            if slot.is_some() {
                warn!("start rejected: a run is already active");
                return Err(DomainError::already_running());
            }
            let token = CancellationToken::new();
            *slot = Some(token.clone());
            token
        };

        // A fresh run discards everything from the previous one
        self.state.send_replace(PipelineState::Idle);
        self.progress.reset();
        self.progress.publish_state(&PipelineState::Idle);
        Ok(token)
    }

    async fn run_stages(
        &self,
        video: &mut dyn VideoSourcePort,
        request: &RunRequest,
        token: &CancellationToken,
    ) -> Result<Arc<AnalysisResult>, DomainError> {
        let budget = self.settings.progress_budget;

        self.transition(PipelineState::Validating);
        self.validate(request)?;
        self.progress.advance_to(budget.validated);
        Self::ensure_active(token)?;

        self.transition(PipelineState::Sampling { progress: 0 });
        self.progress.advance_to(budget.sampling_start);
        let wanted = request.requested_frame_count;
        let samples = self
            .sampler
            .sample_with_progress(video, wanted, token, |captured, total| {
                self.transition(PipelineState::Sampling {
                    progress: ProgressBudget::stage_percent(captured, total),
                });
                self.progress.advance_to(budget.sampling(captured, total));
            })
            .await?;

        if samples.len() != wanted {
            return Err(DomainError::decode(format!(
                "Captured {} of {} requested frames",
                samples.len(),
                wanted
            )));
        }

        self.transition(PipelineState::Requesting);
        let analysis_request = AnalysisRequestBuilder::build(samples, &request.source_label)?;
        self.progress.advance_to(budget.requesting);
        info!(
            service = self.analysis.service_name(),
            frames = analysis_request.samples().len(),
            payload_bytes = analysis_request.payload_bytes(),
            "requesting analysis"
        );

        let raw = tokio::select! {
            biased;
            _ = token.cancelled() => Err(DomainError::cancelled("Analysis request cancelled")),
            response = self.analysis.analyze(&analysis_request) => response,
        }?;

        self.transition(PipelineState::Assembling);
        self.progress.advance_to(budget.assembling);
        let result = Self::assemble(&raw, &analysis_request)?;

        Ok(Arc::new(result))
    }

    /// Cheap precondition checks ahead of any decoding work.
    ///
    /// Callers that open the video themselves run this first so a rejected
    /// input is never probed.
    pub fn validate(&self, request: &RunRequest) -> Result<(), DomainError> {
        if request.size_bytes > self.settings.max_file_size_bytes {
            return Err(DomainError::resource_too_large(format!(
                "File is {} bytes; the limit is {} bytes",
                request.size_bytes, self.settings.max_file_size_bytes
            )));
        }

        if request.requested_frame_count > self.settings.max_frame_count {
            return Err(DomainError::resource_too_large(format!(
                "{} frames requested; the limit is {}",
                request.requested_frame_count, self.settings.max_frame_count
            )));
        }

        Ok(())
    }

    fn ensure_active(token: &CancellationToken) -> Result<(), DomainError> {
        if token.is_cancelled() {
            return Err(DomainError::cancelled("Run cancelled before sampling"));
        }
        Ok(())
    }

    /// Validate the raw payload and merge it with the captured samples
    fn assemble(raw: &str, request: &AnalysisRequest) -> Result<AnalysisResult, DomainError> {
        let value = ResponseSchema::film_analysis().parse(raw)?;
        let result: AnalysisResult = serde_json::from_value(value).map_err(|e| {
            DomainError::malformed_response(format!(
                "Response does not match the analysis contract: {}",
                e
            ))
        })?;

        if result.total_shots as usize != result.shots.len() {
            warn!(
                total_shots = result.total_shots,
                listed = result.shots.len(),
                "shot count differs from listed shots"
            );
        }

        Ok(result.with_frames(request.shared_samples()))
    }

    fn transition(&self, next: PipelineState) {
        let applied = self.state.send_if_modified(|current| {
            if current.can_transition_to(&next) {
                *current = next.clone();
                true
            } else {
                false
            }
        });

        if applied {
            match &next {
                PipelineState::Sampling { .. } => {}
                other => info!(state = %other, "pipeline state changed"),
            }
            self.progress.publish_state(&next);
        } else {
            warn!(current = %self.state(), rejected = %next, "ignored non-monotonic transition");
        }
    }
}
