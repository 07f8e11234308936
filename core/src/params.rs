//! Runtime-mutable algorithm parameter table.
//!
//! Every detection and tracking algorithm owns one row of floats. Row length is
//! the algorithm's declared parameter count; reads and writes past it are
//! ignored. Typed parameter structs are decoded from these rows by each
//! algorithm module (`from_row`).

use log::debug;
use serde::{Deserialize, Serialize};

/// Selectable detection algorithms, in protocol id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DetectionAlgorithmId {
    MaxPeak,
    DoubleWave,
    DoubleWavelet,
    #[default]
    DoubleDerivate,
    RmsConvolution,
    MatchedFilter,
    Music,
}

impl DetectionAlgorithmId {
    pub const ALL: [DetectionAlgorithmId; 7] = [
        DetectionAlgorithmId::MaxPeak,
        DetectionAlgorithmId::DoubleWave,
        DetectionAlgorithmId::DoubleWavelet,
        DetectionAlgorithmId::DoubleDerivate,
        DetectionAlgorithmId::RmsConvolution,
        DetectionAlgorithmId::MatchedFilter,
        DetectionAlgorithmId::Music,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn parameter_names(self) -> &'static [&'static str] {
        match self {
            Self::MaxPeak => &["offset"],
            Self::DoubleWave => &["offset", "threshold", "firstOrder", "secondOrder", "snrMin"],
            Self::DoubleWavelet => &[
                "offset",
                "threshold",
                "firstDamping",
                "numWidth",
                "secondWidth",
                "snrMin",
            ],
            Self::DoubleDerivate => &["offset", "threshold", "firstOrder", "secondOrder", "snrMin"],
            Self::RmsConvolution => &[
                "offset",
                "damping",
                "meanWidth",
                "sourceWidth",
                "derivativeWidth",
                "enableBackgroundCompensation",
                "snrMin",
            ],
            Self::MatchedFilter => &[
                "offset",
                "stdFactor",
                "damping",
                "sourceWidth",
                "derivativeWidth",
                "snrMin",
            ],
            Self::Music => &[
                "offset",
                "sourceWidth",
                "nbDiags",
                "maxEVDIterations",
                "historyLength",
                "maxSources",
                "snrMin",
            ],
        }
    }

    pub fn default_row(self) -> &'static [f32] {
        match self {
            Self::MaxPeak => &[0.0],
            Self::DoubleWave => &[0.0, 0.3, 3.0, 3.0, 6.0],
            Self::DoubleWavelet => &[0.0, 0.3, 0.5, 1.0, 4.0, 6.0],
            Self::DoubleDerivate => &[0.0, 0.3, 3.0, 3.0, 6.0],
            Self::RmsConvolution => &[0.0, 0.5, 32.0, 4.0, 4.0, 0.0, 6.0],
            Self::MatchedFilter => &[0.0, 0.5, 0.5, 7.0, 3.0, 6.0],
            Self::Music => &[0.0, 4.0, 16.0, 30.0, 4.0, 0.0, 3.0],
        }
    }
}

/// Selectable trackers, in protocol id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackingAlgorithmId {
    NoTracking,
    #[default]
    AlphaBeta,
    LinearRegression,
}

impl TrackingAlgorithmId {
    pub const ALL: [TrackingAlgorithmId; 3] = [
        TrackingAlgorithmId::NoTracking,
        TrackingAlgorithmId::AlphaBeta,
        TrackingAlgorithmId::LinearRegression,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Maps a raw protocol value into `[0, numTrackAlgos - 1]`.
    pub fn from_index_clamped(raw: i64) -> Self {
        let last = (Self::ALL.len() - 1) as i64;
        Self::ALL[raw.clamp(0, last) as usize]
    }

    pub fn parameter_names(self) -> &'static [&'static str] {
        match self {
            Self::NoTracking => &[],
            Self::AlphaBeta => &["alpha", "beta", "persistence"],
            Self::LinearRegression => &["maxDistanceDelta", "maxIntensityDelta", "minSnrToTrack"],
        }
    }

    pub fn default_row(self) -> &'static [f32] {
        match self {
            Self::NoTracking => &[],
            Self::AlphaBeta => &[0.5, 0.2, 5.0],
            Self::LinearRegression => &[1.0, 40.0, 3.0],
        }
    }
}

/// Reads `row[index]`, falling back when the row is short.
pub fn row_value(row: &[f32], index: usize, fallback: f32) -> f32 {
    row.get(index).copied().unwrap_or(fallback)
}

/// The full (algorithm id, parameter index) -> value table plus active selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmParameterSet {
    pub detection_algorithm: DetectionAlgorithmId,
    pub tracking_algorithm: TrackingAlgorithmId,
    detection_rows: Vec<Vec<f32>>,
    tracking_rows: Vec<Vec<f32>>,
}

impl Default for AlgorithmParameterSet {
    fn default() -> Self {
        Self {
            detection_algorithm: DetectionAlgorithmId::default(),
            tracking_algorithm: TrackingAlgorithmId::default(),
            detection_rows: DetectionAlgorithmId::ALL
                .iter()
                .map(|id| id.default_row().to_vec())
                .collect(),
            tracking_rows: TrackingAlgorithmId::ALL
                .iter()
                .map(|id| id.default_row().to_vec())
                .collect(),
        }
    }
}

impl AlgorithmParameterSet {
    /// Repairs rows loaded from an external source so each has its declared length.
    pub fn normalized(mut self) -> Self {
        self.detection_rows.resize(DetectionAlgorithmId::ALL.len(), Vec::new());
        for (row, id) in self.detection_rows.iter_mut().zip(DetectionAlgorithmId::ALL) {
            fit_row(row, id.default_row());
        }
        self.tracking_rows.resize(TrackingAlgorithmId::ALL.len(), Vec::new());
        for (row, id) in self.tracking_rows.iter_mut().zip(TrackingAlgorithmId::ALL) {
            fit_row(row, id.default_row());
        }
        self
    }

    pub fn detection_row(&self, id: DetectionAlgorithmId) -> &[f32] {
        self.detection_rows
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or_else(|| id.default_row())
    }

    pub fn tracking_row(&self, id: TrackingAlgorithmId) -> &[f32] {
        self.tracking_rows
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or_else(|| id.default_row())
    }

    pub fn active_detection_row(&self) -> &[f32] {
        self.detection_row(self.detection_algorithm)
    }

    pub fn active_tracking_row(&self) -> &[f32] {
        self.tracking_row(self.tracking_algorithm)
    }

    pub fn detection_parameter(&self, id: DetectionAlgorithmId, index: usize) -> Option<f32> {
        self.detection_row(id).get(index).copied()
    }

    pub fn tracking_parameter(&self, id: TrackingAlgorithmId, index: usize) -> Option<f32> {
        self.tracking_row(id).get(index).copied()
    }

    /// Returns `false` (and leaves the table untouched) for undeclared indices.
    pub fn set_detection_parameter(
        &mut self,
        id: DetectionAlgorithmId,
        index: usize,
        value: f32,
    ) -> bool {
        match self
            .detection_rows
            .get_mut(id.index())
            .and_then(|row| row.get_mut(index))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => {
                debug!("ignoring parameter {} for {:?}", index, id);
                false
            }
        }
    }

    pub fn set_tracking_parameter(
        &mut self,
        id: TrackingAlgorithmId,
        index: usize,
        value: f32,
    ) -> bool {
        match self
            .tracking_rows
            .get_mut(id.index())
            .and_then(|row| row.get_mut(index))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => {
                debug!("ignoring parameter {} for {:?}", index, id);
                false
            }
        }
    }
}

fn fit_row(row: &mut Vec<f32>, defaults: &[f32]) {
    if row.len() < defaults.len() {
        row.extend_from_slice(&defaults[row.len()..]);
    }
    row.truncate(defaults.len());
}
