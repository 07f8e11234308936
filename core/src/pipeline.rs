//! Sensor-level driver: per-channel contexts plus the parameter protocol.

use crate::channel::{ChannelContext, SharedInputs};
use crate::config::SensorConfig;
use crate::params::{AlgorithmParameterSet, DetectionAlgorithmId, TrackingAlgorithmId};
use crate::prelude::{CoreError, CoreResult, FrameSummary};
use crate::processing::matched_filter::SOURCE_WIDTH_INDEX;
use crate::processing::{DistanceTable, MatchedFilter};
use crate::projection::ObstacleProjection;
use crate::sensor_interface::{Obstacle, SampleFrame};
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use crate::tracking::TrackIdAllocator;
use serde::{Deserialize, Serialize};

/// Which parameter row a protocol get/set addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterTarget {
    Detection(DetectionAlgorithmId),
    Tracking(TrackingAlgorithmId),
}

pub struct SensorCore {
    config: SensorConfig,
    params: AlgorithmParameterSet,
    channels: Vec<ChannelContext>,
    distances: DistanceTable,
    ids: TrackIdAllocator,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl SensorCore {
    pub fn new(config: SensorConfig, params: AlgorithmParameterSet) -> CoreResult<Self> {
        config.validate()?;
        let channels = (0..config.channel_count)
            .map(|channel| ChannelContext::new(channel, &config))
            .collect();
        let mut core = Self {
            distances: DistanceTable::new(&config),
            params: params.normalized(),
            channels,
            ids: TrackIdAllocator::new(),
            logger: LogManager::default(),
            metrics: MetricsRecorder::new(),
            config,
        };
        core.logger.record(&format!(
            "sensor ready: {} channels, detection {:?}, tracking {:?}",
            core.config.channel_count, core.params.detection_algorithm, core.params.tracking_algorithm
        ));
        core.repair_matched_filter_width();
        Ok(core)
    }

    pub fn with_defaults() -> CoreResult<Self> {
        Self::new(SensorConfig::default(), AlgorithmParameterSet::default())
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn parameters(&self) -> &AlgorithmParameterSet {
        &self.params
    }

    pub fn channel(&self, channel: usize) -> CoreResult<&ChannelContext> {
        self.channels.get(channel).ok_or(CoreError::UnknownChannel {
            channel,
            channel_count: self.config.channel_count,
        })
    }

    pub fn channels(&self) -> &[ChannelContext] {
        &self.channels
    }

    pub fn process_frame(&mut self, channel: usize, samples: &[i32]) -> CoreResult<FrameSummary> {
        let frame = SampleFrame::from_slice(channel, samples, &self.config).map_err(|err| {
            self.metrics.record_rejected();
            err
        })?;
        self.process_sample_frame(&frame)
    }

    /// Frames built outside `SampleFrame::new` (deserialized ones) are checked again here.
    pub fn process_sample_frame(&mut self, frame: &SampleFrame) -> CoreResult<FrameSummary> {
        let channel_count = self.config.channel_count;
        let expected = self.config.samples_per_frame;
        let Some(context) = self.channels.get_mut(frame.channel()) else {
            self.metrics.record_rejected();
            return Err(CoreError::UnknownChannel {
                channel: frame.channel(),
                channel_count,
            });
        };
        if frame.samples().len() != expected {
            self.metrics.record_rejected();
            return Err(CoreError::FrameLength {
                expected,
                actual: frame.samples().len(),
            });
        }
        let shared = SharedInputs {
            config: &self.config,
            params: &self.params,
            distances: &self.distances,
            ids: &self.ids,
        };
        let cycle = context.process(frame, shared);

        self.metrics.record_frame(cycle.summary.detection_count);
        self.metrics
            .record_tracking(cycle.tracking.created, cycle.tracking.dropped);
        if cycle.clamped {
            self.metrics.record_clamp();
            for note in &cycle.summary.notes {
                self.logger.caution(note);
            }
        }
        self.logger.frame(&cycle.summary);
        Ok(cycle.summary)
    }

    /// One record per track slot of every channel.
    pub fn obstacles(&self) -> Vec<Obstacle> {
        ObstacleProjection::project(
            self.channels
                .iter()
                .map(|context| (context.channel(), context.tracks())),
        )
    }

    pub fn set_detection_algorithm(&mut self, id: DetectionAlgorithmId) {
        if self.params.detection_algorithm == id {
            return;
        }
        self.params.detection_algorithm = id;
        self.channels
            .iter_mut()
            .for_each(ChannelContext::reset_detection);
        self.logger
            .record(&format!("detection algorithm set to {:?}", id));
    }

    /// Selects a tracker from a raw protocol value, clamped into the valid ids.
    pub fn set_tracking_algorithm_index(&mut self, raw: i64) -> TrackingAlgorithmId {
        let id = TrackingAlgorithmId::from_index_clamped(raw);
        if id.index() as i64 != raw {
            self.metrics.record_clamp();
            self.logger
                .caution(&format!("tracking algorithm {} clamped to {:?}", raw, id));
        }
        if self.params.tracking_algorithm != id {
            self.params.tracking_algorithm = id;
            self.channels
                .iter_mut()
                .for_each(ChannelContext::reset_tracks);
            self.logger
                .record(&format!("tracking algorithm set to {:?}", id));
        }
        id
    }

    pub fn set_parameter(&mut self, target: ParameterTarget, index: usize, value: f32) -> bool {
        let stored = match target {
            ParameterTarget::Detection(id) => self.params.set_detection_parameter(id, index, value),
            ParameterTarget::Tracking(id) => self.params.set_tracking_parameter(id, index, value),
        };
        if stored && target == ParameterTarget::Detection(DetectionAlgorithmId::MatchedFilter) {
            self.repair_matched_filter_width();
        }
        stored
    }

    /// Stores the fallback width in place of an out-of-range one, so the reset happens once.
    fn repair_matched_filter_width(&mut self) {
        let id = DetectionAlgorithmId::MatchedFilter;
        let filter = MatchedFilter::from_row(self.params.detection_row(id));
        if filter.source_width_reset {
            self.params
                .set_detection_parameter(id, SOURCE_WIDTH_INDEX, filter.source_width as f32);
            self.metrics.record_clamp();
        }
    }

    pub fn parameter(&self, target: ParameterTarget, index: usize) -> Option<f32> {
        match target {
            ParameterTarget::Detection(id) => self.params.detection_parameter(id, index),
            ParameterTarget::Tracking(id) => self.params.tracking_parameter(id, index),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
