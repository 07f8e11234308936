use crate::prelude::FrameSummary;
use log::{debug, info, warn};

/// Frame-level log records for one sensor.
#[derive(Debug, Clone)]
pub struct LogManager {
    scope: String,
}

impl LogManager {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn frame(&self, summary: &FrameSummary) {
        debug!(
            "[{}] channel {} detections {} live tracks {}",
            self.scope, summary.channel, summary.detection_count, summary.live_tracks
        );
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.scope, message);
    }

    pub fn caution(&self, message: &str) {
        warn!("[{}] {}", self.scope, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("tofcore")
    }
}
