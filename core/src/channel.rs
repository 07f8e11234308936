//! Per-channel processing context.
//!
//! Everything a channel carries from one frame to the next lives here, so
//! channels never alias each other's state and can be driven from separate
//! threads as long as each context has one caller at a time.

use crate::config::SensorConfig;
use crate::params::{AlgorithmParameterSet, DetectionAlgorithmId, TrackingAlgorithmId};
use crate::prelude::FrameSummary;
use crate::processing::{
    DetectionAlgorithm, DetectionHistory, DetectionInput, Detector, DetectorState, DistanceTable,
};
use crate::sensor_interface::{DetectionSet, SampleFrame, Track};
use crate::tracking::{
    TrackIdAllocator, Tracker, TrackingAlgorithm, TrackingInput, TrackingReport,
};
use log::debug;

/// Sensor-wide, read-only inputs shared by every channel for one cycle.
#[derive(Clone, Copy)]
pub struct SharedInputs<'a> {
    pub config: &'a SensorConfig,
    pub params: &'a AlgorithmParameterSet,
    pub distances: &'a DistanceTable,
    pub ids: &'a TrackIdAllocator,
}

/// Outcome of one channel cycle.
#[derive(Debug, Clone, Default)]
pub struct ChannelCycle {
    pub summary: FrameSummary,
    pub tracking: TrackingReport,
    pub clamped: bool,
}

#[derive(Debug, Clone)]
pub struct ChannelContext {
    channel: usize,
    detections: DetectionSet,
    history: DetectionHistory,
    detector_state: DetectorState,
    tracks: Vec<Track>,
    detection_algorithm: Option<DetectionAlgorithmId>,
    tracking_algorithm: Option<TrackingAlgorithmId>,
}

impl ChannelContext {
    pub fn new(channel: usize, config: &SensorConfig) -> Self {
        Self {
            channel,
            detections: DetectionSet::with_capacity(config.max_detections),
            history: DetectionHistory::new(config.historic_size, config.max_detections),
            detector_state: DetectorState::default(),
            tracks: vec![Track::unused(channel); config.max_tracks_per_channel],
            detection_algorithm: None,
            tracking_algorithm: None,
        }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn detections(&self) -> &DetectionSet {
        &self.detections
    }

    pub fn history(&self) -> &DetectionHistory {
        &self.history
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn detector_state(&self) -> &DetectorState {
        &self.detector_state
    }

    /// Drops everything the previous detection algorithm left behind.
    pub fn reset_detection(&mut self) {
        self.detections.clear();
        self.detector_state.reset();
        self.detection_algorithm = None;
    }

    pub fn reset_tracks(&mut self) {
        self.tracks.fill(Track::unused(self.channel));
        self.tracking_algorithm = None;
    }

    /// Detection, history and tracking for one frame of this channel.
    pub fn process(&mut self, frame: &SampleFrame, shared: SharedInputs<'_>) -> ChannelCycle {
        let detector = DetectionAlgorithm::from_parameters(shared.params, shared.config);
        if self.detection_algorithm != Some(detector.id()) {
            if self.detection_algorithm.is_some() {
                debug!(
                    "channel {} switching detection to {:?}",
                    self.channel,
                    detector.id()
                );
            }
            self.reset_detection();
            self.detection_algorithm = Some(detector.id());
        }

        let mut cycle = ChannelCycle::default();
        if let DetectionAlgorithm::MatchedFilter(filter) = &detector {
            if filter.source_width_reset {
                cycle.clamped = true;
                cycle
                    .summary
                    .notes
                    .push(format!("matched filter sourceWidth reset to {}", filter.source_width));
            }
        }

        let signal = frame.echo_signal();
        let input = DetectionInput::new(
            self.channel,
            &signal,
            shared.config,
            shared.distances,
            shared.params,
        );
        let count = detector.detect(&input, &mut self.detector_state, &mut self.detections);
        self.history.record(&self.detections);

        let tracker = TrackingAlgorithm::from_parameters(shared.params);
        if self.tracking_algorithm != Some(tracker.id()) {
            self.reset_tracks();
            self.tracking_algorithm = Some(tracker.id());
        }
        let tracking_input = TrackingInput {
            channel: self.channel,
            detections: &self.detections,
            history: &self.history,
            config: shared.config,
            ids: shared.ids,
        };
        cycle.tracking = tracker.update(&tracking_input, &mut self.tracks);

        cycle.summary.channel = self.channel;
        cycle.summary.detection_count = count;
        cycle.summary.live_tracks = self.tracks.iter().filter(|t| t.is_alive()).count();
        cycle
    }
}
