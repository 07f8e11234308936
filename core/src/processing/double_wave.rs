use crate::math::snr::MIN_NOISE;
use crate::params::{row_value, DetectionAlgorithmId};
use crate::processing::derivative::{clamp_order, DerivativeChain};
use crate::processing::{DetectionInput, Detector, DetectorState};
use crate::sensor_interface::DetectionSet;

/// Step-derivative chain gated by the second stage's peak against its own tail RMS.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleWave {
    pub threshold: f32,
    pub first_order: usize,
    pub second_order: usize,
    pub snr_min: f32,
}

impl DoubleWave {
    pub fn from_row(row: &[f32]) -> Self {
        let defaults = DetectionAlgorithmId::DoubleWave.default_row();
        Self {
            threshold: row_value(row, 1, defaults[1]).clamp(0.0, 1.0),
            first_order: clamp_order(row_value(row, 2, defaults[2])),
            second_order: clamp_order(row_value(row, 3, defaults[3])),
            snr_min: row_value(row, 4, defaults[4]),
        }
    }
}

impl Default for DoubleWave {
    fn default() -> Self {
        Self::from_row(DetectionAlgorithmId::DoubleWave.default_row())
    }
}

impl Detector for DoubleWave {
    fn detect(
        &self,
        input: &DetectionInput<'_>,
        _state: &mut DetectorState,
        out: &mut DetectionSet,
    ) -> usize {
        out.clear();
        let chain = DerivativeChain::compute(input.region(), self.first_order, self.second_order);
        let tail = chain.tail_rms().max(MIN_NOISE);

        for candidate in chain.candidates(self.threshold) {
            let snr = 20.0 * (candidate.curvature.abs() / tail).log10();
            if snr < self.snr_min {
                continue;
            }
            if !out.push(input.detection(candidate.position, snr)) {
                break;
            }
        }
        out.count()
    }
}
