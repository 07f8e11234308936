use serde::{Deserialize, Serialize};

pub use crate::config::SensorConfig;
pub use crate::params::{AlgorithmParameterSet, DetectionAlgorithmId, TrackingAlgorithmId};
pub use crate::sensor_interface::{Detection, DetectionSet, Obstacle, SampleFrame, Track};

/// Per-frame result handed back to the caller of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameSummary {
    pub channel: usize,
    pub detection_count: usize,
    pub live_tracks: usize,
    pub notes: Vec<String>,
}

/// Common error type for the core's boundary checks.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("unknown channel {channel} (sensor has {channel_count})")]
    UnknownChannel { channel: usize, channel_count: usize },
    #[error("frame length mismatch: expected {expected} samples, got {actual}")]
    FrameLength { expected: usize, actual: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
