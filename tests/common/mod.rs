//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cinemetrics::domain::errors::DomainError;
use cinemetrics::domain::model::{AnalysisRequest, PipelineEvent};
use cinemetrics::ports::{AnalysisPort, VideoSourcePort};
use tokio::sync::mpsc::UnboundedReceiver;

type SeekHook = Box<dyn Fn(usize) + Send + Sync>;

/// In-memory video with a scripted playhead
pub struct SyntheticVideo {
    duration: Option<f64>,
    dimensions: (u32, u32),
    pub seeks: Vec<f64>,
    pub rasterized: usize,
    pub release_calls: usize,
    released: bool,
    position: Option<f64>,
    stall_at_seek: Option<usize>,
    fail_rasterize_at: Option<usize>,
    on_seek: Option<SeekHook>,
}

impl SyntheticVideo {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            dimensions: (640, 360),
            seeks: Vec::new(),
            rasterized: 0,
            release_calls: 0,
            released: false,
            position: None,
            stall_at_seek: None,
            fail_rasterize_at: None,
            on_seek: None,
        }
    }

    /// A source whose container reports no duration
    pub fn without_duration() -> Self {
        Self {
            duration: None,
            ..Self::new(1.0)
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = (width, height);
        self
    }

    /// The `n`-th seek (1-based) never settles
    pub fn stall_at_seek(mut self, n: usize) -> Self {
        self.stall_at_seek = Some(n);
        self
    }

    /// Rasterizing after the `n`-th seek (1-based) fails
    pub fn fail_rasterize_at(mut self, n: usize) -> Self {
        self.fail_rasterize_at = Some(n);
        self
    }

    /// Called with the 1-based seek number once each seek settles
    pub fn on_seek(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_seek = Some(Box::new(hook));
        self
    }
}

#[async_trait]
impl VideoSourcePort for SyntheticVideo {
    fn duration_seconds(&self) -> Option<f64> {
        self.duration
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    async fn seek_to(&mut self, time_seconds: f64) -> Result<(), DomainError> {
        self.seeks.push(time_seconds);
        let n = self.seeks.len();
        if self.stall_at_seek == Some(n) {
            std::future::pending::<()>().await;
        }
        tokio::task::yield_now().await;
        self.position = Some(time_seconds);
        if let Some(hook) = &self.on_seek {
            hook(n);
        }
        Ok(())
    }

    fn rasterize(&mut self) -> Result<Vec<u8>, DomainError> {
        let n = self.seeks.len();
        if self.fail_rasterize_at == Some(n) {
            return Err(DomainError::decode("corrupt frame"));
        }
        let position = self
            .position
            .ok_or_else(|| DomainError::decode("no frame under the playhead"))?;
        self.rasterized += 1;

        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend_from_slice(&position.to_le_bytes());
        Ok(bytes)
    }

    fn release(&mut self) {
        self.release_calls += 1;
        self.released = true;
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

/// Analysis service double returning a fixed reply
pub struct ScriptedAnalysis {
    reply: Result<String, DomainError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    frames_seen: Mutex<Vec<usize>>,
}

impl ScriptedAnalysis {
    pub fn replying(payload: impl Into<String>) -> Self {
        Self {
            reply: Ok(payload.into()),
            delay: None,
            calls: AtomicUsize::new(0),
            frames_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: DomainError) -> Self {
        Self {
            reply: Err(error),
            ..Self::replying("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of frames carried by each request received
    pub fn frames_seen(&self) -> Vec<usize> {
        self.frames_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisPort for ScriptedAnalysis {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.frames_seen
            .lock()
            .unwrap()
            .push(request.samples().len());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }

    fn service_name(&self) -> &str {
        "scripted"
    }
}

/// A payload satisfying the analysis contract
pub fn valid_payload() -> serde_json::Value {
    serde_json::json!({
        "title": "Test Reel",
        "asl": 7.5,
        "totalShots": 2,
        "dominantColors": ["#1a1a2e", "#e94560"],
        "shots": [
            {
                "id": 1, "startTime": 0.0, "endTime": 12.0, "duration": 12.0,
                "description": "Wide establishing shot of a harbour",
                "colors": ["#1a1a2e"], "cameraMovement": "slow pan",
                "composition": "rule of thirds"
            },
            {
                "id": 2, "startTime": 12.0, "endTime": 15.0, "duration": 3.0,
                "description": "Close-up on a face",
                "colors": ["#e94560"], "cameraMovement": "static",
                "composition": "centered"
            }
        ],
        "audio": {
            "mood": "tense",
            "musicDescription": "low strings",
            "dynamicRange": "wide",
            "keyEvents": ["horn blast"]
        },
        "visualSummary": "Cool palette punctuated by red accents"
    })
}

/// Four-shot reply for a 30 second clip sampled at four frames
pub fn four_shot_payload() -> serde_json::Value {
    let shots: Vec<serde_json::Value> = (0..4)
        .map(|i| {
            let start = f64::from(i) * 7.5;
            serde_json::json!({
                "id": i + 1, "startTime": start, "endTime": start + 7.5, "duration": 7.5,
                "description": format!("Shot {}", i + 1),
                "colors": ["#202020"], "cameraMovement": "static",
                "composition": "centered"
            })
        })
        .collect();

    serde_json::json!({
        "title": "T",
        "asl": 5,
        "totalShots": 4,
        "dominantColors": ["#202020"],
        "shots": shots,
        "audio": {
            "mood": "neutral",
            "musicDescription": "none",
            "dynamicRange": "flat",
            "keyEvents": []
        },
        "visualSummary": "Four even shots"
    })
}

pub fn valid_payload_text() -> String {
    valid_payload().to_string()
}

/// Drain every event published so far
pub fn drain(events: &mut UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

pub fn progress_values(events: &[PipelineEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
