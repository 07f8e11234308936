//! Detection algorithm bank.
//!
//! Every algorithm maps one channel waveform to at most `max_detections`
//! detections through the [`Detector`] capability. [`DetectionAlgorithm`]
//! selects the implementation from the active parameter row.

pub mod derivative;
pub mod double_derivate;
pub mod double_wave;
pub mod double_wavelet;
pub mod history;
pub mod matched_filter;
pub mod max_peak;
pub mod music;
pub mod range;
pub mod rms_convolution;

pub use double_derivate::DoubleDerivate;
pub use double_wave::DoubleWave;
pub use double_wavelet::DoubleWavelet;
pub use history::DetectionHistory;
pub use matched_filter::{MatchedFilter, TemplateBank};
pub use max_peak::MaxPeak;
pub use music::{Music, MusicHistory};
pub use range::DistanceTable;
pub use rms_convolution::RmsConvolution;

use crate::config::SensorConfig;
use crate::math::snr::{SnrHelper, NOISE_WINDOW_MAX};
use crate::params::{row_value, AlgorithmParameterSet, DetectionAlgorithmId};
use crate::sensor_interface::{Detection, DetectionSet};

/// Everything a detector reads for one channel frame.
pub struct DetectionInput<'a> {
    pub channel: usize,
    /// Echo-positive waveform of the whole frame.
    pub signal: &'a [f32],
    pub config: &'a SensorConfig,
    pub distances: &'a DistanceTable,
    /// Hardware system offset plus parameter 0 of the active row.
    pub offset: f32,
}

impl<'a> DetectionInput<'a> {
    pub fn new(
        channel: usize,
        signal: &'a [f32],
        config: &'a SensorConfig,
        distances: &'a DistanceTable,
        params: &AlgorithmParameterSet,
    ) -> Self {
        let offset = config.system_offset_m + row_value(params.active_detection_row(), 0, 0.0);
        Self {
            channel,
            signal,
            config,
            distances,
            offset,
        }
    }

    /// `max(0, acquisitionDelay - deadZone)`, kept inside the frame.
    pub fn start(&self) -> usize {
        self.config.processing_start().min(self.signal.len())
    }

    pub fn region(&self) -> &'a [f32] {
        &self.signal[self.start()..]
    }

    /// Pre-signal samples, or the frame tail when the pre-signal window is too short.
    pub fn noise_window(&self) -> &'a [f32] {
        let len = self.config.noise_window_len().min(self.signal.len());
        if len >= 2 {
            &self.signal[..len]
        } else {
            &self.signal[self.signal.len().saturating_sub(NOISE_WINDOW_MAX)..]
        }
    }

    pub fn noise_floor(&self) -> f32 {
        SnrHelper::noise_floor(
            self.signal,
            self.config.dead_zone,
            self.config.acquisition_delay,
        )
    }

    /// Reported distance for a fractional position inside [`DetectionInput::region`].
    pub fn distance_at(&self, region_position: f32) -> f32 {
        self.distances.at(self.start() as f32 + region_position) + self.offset
    }

    pub fn detection(&self, region_position: f32, snr: f32) -> Detection {
        Detection::new(
            self.distance_at(region_position),
            SnrHelper::intensity_from_snr(snr),
        )
    }
}

/// Detector state a channel carries from one frame to the next.
#[derive(Debug, Clone, Default)]
pub struct DetectorState {
    pub music: MusicHistory,
    pub templates: Option<TemplateBank>,
}

impl DetectorState {
    pub fn reset(&mut self) {
        self.music.clear();
        self.templates = None;
    }
}

/// Common capability of the bank's algorithms. Returns the number of
/// detections written into `out`.
pub trait Detector {
    fn detect(
        &self,
        input: &DetectionInput<'_>,
        state: &mut DetectorState,
        out: &mut DetectionSet,
    ) -> usize;
}

/// Tagged selection over the bank, built from the active parameter row.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionAlgorithm {
    MaxPeak(MaxPeak),
    DoubleWave(DoubleWave),
    DoubleWavelet(DoubleWavelet),
    DoubleDerivate(DoubleDerivate),
    RmsConvolution(RmsConvolution),
    MatchedFilter(MatchedFilter),
    Music(Music),
}

impl DetectionAlgorithm {
    pub fn from_parameters(params: &AlgorithmParameterSet, config: &SensorConfig) -> Self {
        let id = params.detection_algorithm;
        Self::for_id(id, params.detection_row(id), config)
    }

    pub fn for_id(id: DetectionAlgorithmId, row: &[f32], config: &SensorConfig) -> Self {
        match id {
            DetectionAlgorithmId::MaxPeak => Self::MaxPeak(MaxPeak),
            DetectionAlgorithmId::DoubleWave => Self::DoubleWave(DoubleWave::from_row(row)),
            DetectionAlgorithmId::DoubleWavelet => {
                Self::DoubleWavelet(DoubleWavelet::from_row(row))
            }
            DetectionAlgorithmId::DoubleDerivate => {
                Self::DoubleDerivate(DoubleDerivate::from_row(row))
            }
            DetectionAlgorithmId::RmsConvolution => {
                Self::RmsConvolution(RmsConvolution::from_row(row))
            }
            DetectionAlgorithmId::MatchedFilter => {
                Self::MatchedFilter(MatchedFilter::from_row(row))
            }
            DetectionAlgorithmId::Music => Self::Music(Music::from_row(row, config)),
        }
    }

    pub fn id(&self) -> DetectionAlgorithmId {
        match self {
            Self::MaxPeak(_) => DetectionAlgorithmId::MaxPeak,
            Self::DoubleWave(_) => DetectionAlgorithmId::DoubleWave,
            Self::DoubleWavelet(_) => DetectionAlgorithmId::DoubleWavelet,
            Self::DoubleDerivate(_) => DetectionAlgorithmId::DoubleDerivate,
            Self::RmsConvolution(_) => DetectionAlgorithmId::RmsConvolution,
            Self::MatchedFilter(_) => DetectionAlgorithmId::MatchedFilter,
            Self::Music(_) => DetectionAlgorithmId::Music,
        }
    }
}

impl Detector for DetectionAlgorithm {
    fn detect(
        &self,
        input: &DetectionInput<'_>,
        state: &mut DetectorState,
        out: &mut DetectionSet,
    ) -> usize {
        match self {
            Self::MaxPeak(algo) => algo.detect(input, state, out),
            Self::DoubleWave(algo) => algo.detect(input, state, out),
            Self::DoubleWavelet(algo) => algo.detect(input, state, out),
            Self::DoubleDerivate(algo) => algo.detect(input, state, out),
            Self::RmsConvolution(algo) => algo.detect(input, state, out),
            Self::MatchedFilter(algo) => algo.detect(input, state, out),
            Self::Music(algo) => algo.detect(input, state, out),
        }
    }
}
