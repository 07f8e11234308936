use crate::math::snr::SnrHelper;
use crate::params::{row_value, DetectionAlgorithmId};
use crate::processing::derivative::{clamp_order, DerivativeChain};
use crate::processing::{DetectionInput, Detector, DetectorState};
use crate::sensor_interface::DetectionSet;

/// Default detector: step-derivative chain with an SNR gate against the
/// pre-signal noise window.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleDerivate {
    pub threshold: f32,
    pub first_order: usize,
    pub second_order: usize,
    pub snr_min: f32,
}

impl DoubleDerivate {
    pub fn from_row(row: &[f32]) -> Self {
        let defaults = DetectionAlgorithmId::DoubleDerivate.default_row();
        Self {
            threshold: row_value(row, 1, defaults[1]).clamp(0.0, 1.0),
            first_order: clamp_order(row_value(row, 2, defaults[2])),
            second_order: clamp_order(row_value(row, 3, defaults[3])),
            snr_min: row_value(row, 4, defaults[4]),
        }
    }
}

impl Default for DoubleDerivate {
    fn default() -> Self {
        Self::from_row(DetectionAlgorithmId::DoubleDerivate.default_row())
    }
}

impl Detector for DoubleDerivate {
    fn detect(
        &self,
        input: &DetectionInput<'_>,
        _state: &mut DetectorState,
        out: &mut DetectionSet,
    ) -> usize {
        out.clear();
        let region = input.region();
        let chain = DerivativeChain::compute(region, self.first_order, self.second_order);
        let noise = input.noise_floor();
        let half_width = self.first_order + self.second_order;

        for candidate in chain.candidates(self.threshold) {
            let snr = SnrHelper::snr_at_detection(region, candidate.index, half_width, noise);
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
