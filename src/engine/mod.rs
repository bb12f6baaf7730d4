//! Pipeline engines: frame sampling and progress tracking

pub mod progress;
pub mod sampler;

pub use progress::ProgressTracker;
pub use sampler::FrameSampler;
