use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Point-in-time copy of the sensor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub frames_processed: u64,
    pub detections_emitted: u64,
    pub tracks_created: u64,
    pub detections_dropped: u64,
    pub parameter_clamps: u64,
    pub rejected_frames: u64,
}

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_frame(&self, detections: usize) {
        self.update(|m| {
            m.frames_processed += 1;
            m.detections_emitted += detections as u64;
        });
    }

    pub fn record_tracking(&self, created: usize, dropped: usize) {
        self.update(|m| {
            m.tracks_created += created as u64;
            m.detections_dropped += dropped as u64;
        });
    }

    pub fn record_clamp(&self) {
        self.update(|m| m.parameter_clamps += 1);
    }

    pub fn record_rejected(&self) {
        self.update(|m| m.rejected_frames += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
