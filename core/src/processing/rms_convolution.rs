use crate::math::kernel::KernelHelper;
use crate::math::snr::{SnrHelper, MIN_NOISE};
use crate::math::stats::StatsHelper;
use crate::params::{row_value, DetectionAlgorithmId};
use crate::processing::{DetectionInput, Detector, DetectorState};
use crate::sensor_interface::DetectionSet;

const MAX_WIDTH: usize = 32;
const MAX_MEAN_WIDTH: usize = 256;

/// Windowed energy test against a power-form threshold, confirmed by a
/// log-normal derivative zero crossing.
#[derive(Debug, Clone, PartialEq)]
pub struct RmsConvolution {
    pub damping: f32,
    pub mean_width: usize,
    pub source_width: usize,
    pub derivative_width: usize,
    pub background_compensation: bool,
    pub snr_min: f32,
}

impl RmsConvolution {
    pub fn from_row(row: &[f32]) -> Self {
        let defaults = DetectionAlgorithmId::RmsConvolution.default_row();
        let width = |index: usize, max: usize| {
            (row_value(row, index, defaults[index]).round().max(1.0) as usize).min(max)
        };
        Self {
            damping: row_value(row, 1, defaults[1]).clamp(0.05, 5.0),
            mean_width: width(2, MAX_MEAN_WIDTH),
            source_width: width(3, MAX_WIDTH),
            derivative_width: width(4, MAX_WIDTH),
            background_compensation: row_value(row, 5, defaults[5]) != 0.0,
            snr_min: row_value(row, 6, defaults[6]),
        }
    }

    /// `(2*halfWidth+1) * (noiseStd * 10^(snrMin/20))^2`
    pub fn energy_threshold(&self, noise_std: f32) -> f32 {
        let amplitude = noise_std * 10f32.powf(self.snr_min / 20.0);
        (2 * self.source_width + 1) as f32 * amplitude * amplitude
    }

    /// Subtracts a moving mean over `±mean_width`. Samples above `clip` are
    /// clipped before averaging so echoes do not bias their own background.
    fn compensate(&self, region: &[f32], clip: f32) -> Vec<f32> {
        let prefix = prefix_sums(region.iter().map(|&v| v.min(clip)));
        (0..region.len())
            .map(|i| {
                let lo = i.saturating_sub(self.mean_width);
                let hi = (i + self.mean_width + 1).min(region.len());
                let mean = (prefix[hi] - prefix[lo]) / (hi - lo) as f32;
                region[i] - mean
            })
            .collect()
    }
}

impl Default for RmsConvolution {
    fn default() -> Self {
        Self::from_row(DetectionAlgorithmId::RmsConvolution.default_row())
    }
}

fn prefix_sums(values: impl Iterator<Item = f32>) -> Vec<f32> {
    let mut sums = vec![0.0];
    let mut acc = 0.0;
    for value in values {
        acc += value;
        sums.push(acc);
    }
    sums
}

impl Detector for RmsConvolution {
    fn detect(
        &self,
        input: &DetectionInput<'_>,
        _state: &mut DetectorState,
        out: &mut DetectionSet,
    ) -> usize {
        out.clear();
        let noise_window = input.noise_window();
        let noise = input.noise_floor();
        let noise_mean = StatsHelper::mean(noise_window);
        let (signal, baseline) = if self.background_compensation {
            (self.compensate(input.region(), noise_mean + 3.0 * noise), 0.0)
        } else {
            (input.region().to_vec(), noise_mean)
        };

        let energy_prefix = prefix_sums(signal.iter().map(|v| (v - baseline) * (v - baseline)));
        let window_energy = |center: usize| {
            let lo = center.saturating_sub(self.source_width);
            let hi = (center + self.source_width + 1).min(signal.len());
            energy_prefix[hi] - energy_prefix[lo]
        };
        let threshold = self.energy_threshold(noise);

        let derivative = KernelHelper::convolution(
            &signal,
            &KernelHelper::log_normal_derivative_kernel(self.derivative_width, self.damping),
        );
        let delay = self.derivative_width as f32;
        let taps = (2 * self.source_width + 1) as f32;

        let mut hits = Vec::new();
        for n in (2 * self.derivative_width).max(1)..derivative.len() {
            if !(derivative[n - 1] < 0.0 && derivative[n] >= 0.0) {
                continue;
            }
            let before = if n >= 2 { derivative[n - 2] } else { derivative[n - 1] };
            let after = derivative.get(n + 1).copied().unwrap_or(derivative[n]);
            let t = SnrHelper::interpolate_crossing(before, derivative[n - 1], derivative[n], after);
            let position = (n - 1) as f32 + t - delay;
            if position < 0.0 {
                continue;
            }
            let energy = window_energy(position.round() as usize);
            if energy < threshold {
                continue;
            }
            let snr = 10.0 * ((energy / taps) / (noise * noise).max(MIN_NOISE)).log10();
            hits.push((energy, position, snr));
        }

        hits.sort_by(|a, b| b.0.total_cmp(&a.0));
        for (_, position, snr) in hits {
            if !out.push(input.detection(position, snr)) {
                break;
            }
        }
        out.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::processing::fixtures::{echo_signal, nearest, run};
    use crate::processing::{DetectionAlgorithm, DistanceTable};

    #[test]
    fn threshold_is_power_form() {
        let algo = RmsConvolution::from_row(&[0.0, 0.5, 32.0, 4.0, 4.0, 0.0, 20.0]);
        // 9 taps * (2 * 10)^2
        assert!((algo.energy_threshold(2.0) - 3600.0).abs() < 1e-2);
    }

    #[test]
    fn pulse_is_reported_within_one_sample() {
        let config = SensorConfig::default();
        let table = DistanceTable::new(&config);
        let signal = echo_signal(1024, &[(512.0, 500.0, 2.5)], 4.0, 17);
        let algo = DetectionAlgorithm::RmsConvolution(RmsConvolution::default());
        let out = run(&algo, &signal, &config, &mut DetectorState::default());
        let hit = nearest(&out, table.at_index(512)).expect("pulse detected");
        assert!((hit.distance - table.at_index(512)).abs() <= table.per_sample());
    }

    #[test]
    fn background_compensation_handles_offset() {
        let config = SensorConfig::default();
        let table = DistanceTable::new(&config);
        let signal: Vec<f32> = echo_signal(1024, &[(700.0, 500.0, 2.5)], 4.0, 9)
            .into_iter()
            .map(|v| v + 3000.0)
            .collect();
        let row = [0.0, 0.5, 32.0, 4.0, 4.0, 1.0, 6.0];
        let algo = DetectionAlgorithm::RmsConvolution(RmsConvolution::from_row(&row));
        let out = run(&algo, &signal, &config, &mut DetectorState::default());
        let hit = nearest(&out, table.at_index(700)).expect("pulse detected");
        assert!((hit.distance - table.at_index(700)).abs() <= table.per_sample());
    }
}
