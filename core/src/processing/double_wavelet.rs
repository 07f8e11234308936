use crate::math::kernel::KernelHelper;
use crate::math::snr::SnrHelper;
use crate::math::stats::StatsHelper;
use crate::params::{row_value, DetectionAlgorithmId};
use crate::processing::{DetectionInput, Detector, DetectorState};
use crate::sensor_interface::DetectionSet;

/// Half width of the log-normal first-derivative kernel.
const FIRST_HALF_WIDTH: usize = 6;
/// Candidates from different widths within this distance vote together.
const CLUSTER_TOLERANCE_M: f32 = 0.01;
pub const MAX_WAVELET_DETECTIONS: usize = 8;
const MAX_NUM_WIDTH: usize = 4;
const MAX_SECOND_WIDTH: usize = 16;

/// Log-normal derivative followed by a family of sine wavelets.
///
/// A position is reported only when every width variant produced a
/// candidate there: exactly `2*num_width+1` hits.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleWavelet {
    pub threshold: f32,
    pub first_damping: f32,
    pub num_width: usize,
    pub second_width: usize,
    pub snr_min: f32,
}

#[derive(Debug, Clone, Copy)]
struct WidthCandidate {
    distance: f32,
    position: f32,
}

impl DoubleWavelet {
    pub fn from_row(row: &[f32]) -> Self {
        let defaults = DetectionAlgorithmId::DoubleWavelet.default_row();
        let num_width = (row_value(row, 3, defaults[3]).round().max(0.0) as usize).min(MAX_NUM_WIDTH);
        let second_width = (row_value(row, 4, defaults[4]).round().max(1.0) as usize)
            .clamp(num_width + 1, MAX_SECOND_WIDTH + num_width);
        Self {
            threshold: row_value(row, 1, defaults[1]).clamp(0.0, 1.0),
            first_damping: row_value(row, 2, defaults[2]).clamp(0.05, 5.0),
            num_width,
            second_width,
            snr_min: row_value(row, 5, defaults[5]),
        }
    }

    pub fn widths(&self) -> impl Iterator<Item = usize> {
        (self.second_width - self.num_width)..=(self.second_width + self.num_width)
    }

    fn width_candidates(
        &self,
        input: &DetectionInput<'_>,
        first: &[f32],
        width: usize,
    ) -> Vec<WidthCandidate> {
        let second = KernelHelper::convolution(first, &KernelHelper::sine_lobe(width));
        let floor = StatsHelper::min(&second);
        if floor >= 0.0 {
            return Vec::new();
        }
        let limit = self.threshold * floor;
        let delay = (FIRST_HALF_WIDTH + width) as f32;
        let settled = 2 * (FIRST_HALF_WIDTH + width);

        let mut found = Vec::new();
        for n in settled.max(1)..second.len() {
            if !(second[n - 1] < 0.0 && second[n] >= 0.0) {
                continue;
            }
            let lobe = StatsHelper::min(&second[n.saturating_sub(2 * width + 1)..n]);
            if lobe >= limit {
                continue;
            }
            let before = if n >= 2 { second[n - 2] } else { second[n - 1] };
            let after = second.get(n + 1).copied().unwrap_or(second[n]);
            let t = SnrHelper::interpolate_crossing(before, second[n - 1], second[n], after);
            let position = (n - 1) as f32 + t - delay;
            if position >= 0.0 {
                found.push(WidthCandidate {
                    distance: input.distance_at(position),
                    position,
                });
            }
        }
        found
    }
}

impl Default for DoubleWavelet {
    fn default() -> Self {
        Self::from_row(DetectionAlgorithmId::DoubleWavelet.default_row())
    }
}

impl Detector for DoubleWavelet {
    fn detect(
        &self,
        input: &DetectionInput<'_>,
        _state: &mut DetectorState,
        out: &mut DetectionSet,
    ) -> usize {
        out.clear();
        let region = input.region();
        let first = KernelHelper::convolution(
            region,
            &KernelHelper::log_normal_derivative_kernel(FIRST_HALF_WIDTH, self.first_damping),
        );
        let per_width: Vec<Vec<WidthCandidate>> = self
            .widths()
            .map(|width| self.width_candidates(input, &first, width))
            .collect();

        // Unanimous vote: every width must confirm the position.
        let required = 2 * self.num_width + 1;
        let noise = input.noise_floor();
        let mut reported = 0;
        for anchor in &per_width[self.num_width] {
            if reported == MAX_WAVELET_DETECTIONS {
                break;
            }
            let cluster: Vec<&WidthCandidate> = per_width
                .iter()
                .flatten()
                .filter(|c| (c.distance - anchor.distance).abs() <= CLUSTER_TOLERANCE_M)
                .collect();
            if cluster.len() != required {
                continue;
            }
            let position =
                cluster.iter().map(|c| c.position).sum::<f32>() / cluster.len() as f32;
            let snr = SnrHelper::snr_at_detection(
                region,
                position.round() as usize,
                self.second_width,
                noise,
            );
            if snr < self.snr_min {
                continue;
            }
            if !out.push(input.detection(position, snr)) {
                break;
            }
            reported += 1;
        }
        out.count()
    }
}
