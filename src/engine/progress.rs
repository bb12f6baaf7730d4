//! Progress tracking and event fan-out for pipeline observers

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::domain::model::{PipelineEvent, PipelineState};

/// Progress tracker with thread-safe updates.
///
/// Reported values never decrease within a run; a value equal to the last
/// one is swallowed so observers see one event per real advance.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressTrackerInner>>,
}

struct ProgressTrackerInner {
    percent: u8,
    start_time: Instant,
    subscribers: Vec<UnboundedSender<PipelineEvent>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        let inner = ProgressTrackerInner {
            percent: 0,
            start_time: Instant::now(),
            subscribers: Vec::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Register an observer; it receives every event published from now on
    pub fn subscribe(&self) -> UnboundedReceiver<PipelineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut inner) = self.inner.lock() {
            inner.subscribers.push(tx);
        }
        rx
    }

    /// Start a new run: progress drops back to zero
    pub fn reset(&self) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(_) => return,
        };
        inner.percent = 0;
        inner.start_time = Instant::now();
        Self::broadcast(&mut inner, PipelineEvent::Progress(0));
    }

    /// Advance to `percent`; returns whether an event was emitted
    pub fn advance_to(&self, percent: u8) -> bool {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(_) => return false,
        };
        let percent = percent.min(100);
        if percent <= inner.percent {
            return false;
        }
        inner.percent = percent;
        tracing::debug!(percent, elapsed_ms = inner.start_time.elapsed().as_millis() as u64, "progress");
        Self::broadcast(&mut inner, PipelineEvent::Progress(percent));
        true
    }

    /// Forward a state transition to observers
    pub fn publish_state(&self, state: &PipelineState) {
        if let Ok(mut inner) = self.inner.lock() {
            Self::broadcast(&mut inner, PipelineEvent::State(state.clone()));
        }
    }

    /// Last reported progress value
    pub fn percent(&self) -> u8 {
        self.inner.lock().map(|inner| inner.percent).unwrap_or(0)
    }

    /// Time since the current run started
    pub fn elapsed(&self) -> Duration {
        self.inner
            .lock()
            .map(|inner| inner.start_time.elapsed())
            .unwrap_or_default()
    }

    fn broadcast(inner: &mut ProgressTrackerInner, event: PipelineEvent) {
        // Dropped receivers are pruned
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
