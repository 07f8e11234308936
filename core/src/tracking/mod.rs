//! Tracker bank.
//!
//! Exactly one tracker is active sensor-wide. Each one rewrites a channel's
//! track slots from that channel's detections (and, for the regression
//! tracker, its detection history).

pub mod alpha_beta;
pub mod linear_regression;
pub mod passthrough;

pub use alpha_beta::AlphaBeta;
pub use linear_regression::LinearRegression;
pub use passthrough::Passthrough;

use crate::config::SensorConfig;
use crate::params::{AlgorithmParameterSet, TrackingAlgorithmId};
use crate::processing::DetectionHistory;
use crate::sensor_interface::{DetectionSet, Track};
use std::sync::atomic::{AtomicU32, Ordering};

/// Sensor-wide source of track ids. Id 0 is reserved for "no obstacle".
#[derive(Debug)]
pub struct TrackIdAllocator {
    next: AtomicU32,
}

impl TrackIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    pub fn next_id(&self) -> u32 {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }
}

impl Default for TrackIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// What a tracker reads for one channel cycle.
pub struct TrackingInput<'a> {
    pub channel: usize,
    pub detections: &'a DetectionSet,
    pub history: &'a DetectionHistory,
    pub config: &'a SensorConfig,
    pub ids: &'a TrackIdAllocator,
}

/// Slot bookkeeping of one tracker cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingReport {
    pub created: usize,
    pub dropped: usize,
}

pub trait Tracker {
    fn update(&self, input: &TrackingInput<'_>, tracks: &mut [Track]) -> TrackingReport;
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackingAlgorithm {
    NoTracking(Passthrough),
    AlphaBeta(AlphaBeta),
    LinearRegression(LinearRegression),
}

impl TrackingAlgorithm {
    pub fn from_parameters(params: &AlgorithmParameterSet) -> Self {
        let id = params.tracking_algorithm;
        Self::for_id(id, params.tracking_row(id))
    }

    pub fn for_id(id: TrackingAlgorithmId, row: &[f32]) -> Self {
        match id {
            TrackingAlgorithmId::NoTracking => Self::NoTracking(Passthrough),
            TrackingAlgorithmId::AlphaBeta => Self::AlphaBeta(AlphaBeta::from_row(row)),
            TrackingAlgorithmId::LinearRegression => {
                Self::LinearRegression(LinearRegression::from_row(row))
            }
        }
    }

    pub fn id(&self) -> TrackingAlgorithmId {
        match self {
            Self::NoTracking(_) => TrackingAlgorithmId::NoTracking,
            Self::AlphaBeta(_) => TrackingAlgorithmId::AlphaBeta,
            Self::LinearRegression(_) => TrackingAlgorithmId::LinearRegression,
        }
    }
}

impl Tracker for TrackingAlgorithm {
    fn update(&self, input: &TrackingInput<'_>, tracks: &mut [Track]) -> TrackingReport {
        match self {
            Self::NoTracking(tracker) => tracker.update(input, tracks),
            Self::AlphaBeta(tracker) => tracker.update(input, tracks),
            Self::LinearRegression(tracker) => tracker.update(input, tracks),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::sensor_interface::Detection;

    pub fn detections(config: &SensorConfig, entries: &[(f32, i32)]) -> DetectionSet {
        let mut set = DetectionSet::with_capacity(config.max_detections);
        for &(distance, intensity) in entries {
            set.push(Detection::new(distance, intensity));
        }
        set
    }

    pub fn slots(config: &SensorConfig, channel: usize) -> Vec<Track> {
        vec![Track::unused(channel); config.max_tracks_per_channel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let ids = TrackIdAllocator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn wrapped_counter_skips_the_sentinel() {
        let ids = TrackIdAllocator {
            next: AtomicU32::new(u32::MAX),
        };
        assert_eq!(ids.next_id(), u32::MAX);
        assert_eq!(ids.next_id(), 1);
    }

    #[test]
    fn selection_follows_parameter_set() {
        let mut params = AlgorithmParameterSet::default();
        assert_eq!(
            TrackingAlgorithm::from_parameters(&params).id(),
            TrackingAlgorithmId::AlphaBeta
        );
        params.tracking_algorithm = TrackingAlgorithmId::LinearRegression;
        assert_eq!(
            TrackingAlgorithm::from_parameters(&params).id(),
            TrackingAlgorithmId::LinearRegression
        );
    }
}
