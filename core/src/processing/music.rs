//! Subspace (MUSIC) detector.
//!
//! Captures accumulate per channel until `history_length` are buffered; the
//! detector then runs once over them and starts accumulating again. The
//! autocorrelation is banded: only `nb_diags` diagonals are estimated, the
//! rest of the band is extrapolated from the outermost true diagonal.

use crate::config::SensorConfig;
use crate::math::banded::BandedMatrix;
use crate::math::kernel::KernelHelper;
use crate::math::snr::MIN_NOISE;
use crate::math::stats::StatsHelper;
use crate::params::{row_value, DetectionAlgorithmId};
use crate::processing::{DetectionInput, Detector, DetectorState};
use crate::sensor_interface::DetectionSet;
use log::debug;
use ndarray::Array1;

/// Per-diagonal factors applied to the outermost true diagonal.
pub const DIAGONAL_ATTENUATION: [f32; 16] = [
    0.85, 0.7, 0.55, 0.42, 0.31, 0.22, 0.15, 0.1, 0.065, 0.04, 0.025, 0.015, 0.009, 0.005, 0.003,
    0.001,
];
/// Empirical weight of the signal subspace in the noise projector.
pub const PROJECTOR_SCALE: f32 = 0.95;
pub const PHASE_COUNT: usize = 17;
pub const PEAK_LEVEL: f32 = 0.5;
pub const REFINE_PRECISION: f32 = 0.05;
const MIN_SOURCE_WIDTH: usize = 2;
const MAX_SOURCE_WIDTH: usize = 8;
const MAX_EVD_ITERATIONS: usize = 500;
const MIN_PROJECTION: f32 = 1e-6;

/// Raw captures buffered for one channel between runs.
#[derive(Debug, Clone, Default)]
pub struct MusicHistory {
    captures: Vec<Vec<f32>>,
    last_source_count: Option<usize>,
    last_eigenvalues: Vec<f32>,
}

impl MusicHistory {
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn push(&mut self, capture: &[f32]) {
        self.captures.push(capture.to_vec());
    }

    /// Hands the buffered captures over and empties the buffer.
    pub fn take(&mut self) -> Vec<Vec<f32>> {
        std::mem::take(&mut self.captures)
    }

    pub fn clear(&mut self) {
        self.captures.clear();
        self.last_source_count = None;
        self.last_eigenvalues.clear();
    }

    /// Source count used by the most recent run.
    pub fn last_source_count(&self) -> Option<usize> {
        self.last_source_count
    }

    pub fn last_eigenvalues(&self) -> &[f32] {
        &self.last_eigenvalues
    }
}

#[derive(Debug, Clone)]
struct Eigenpair {
    value: f32,
    vector: Array1<f32>,
}

/// A located source: fractional position in the region and its spectrum level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumPeak {
    pub position: f32,
    pub level: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Music {
    pub source_width: usize,
    pub nb_diags: usize,
    pub max_iterations: usize,
    pub history_length: usize,
    /// Zero lets the eigenvalue decay decide.
    pub max_sources: usize,
    pub snr_min: f32,
    pub band_width: usize,
}

impl Music {
    /// Decodes and clamps the row; out-of-range values never fail.
    pub fn from_row(row: &[f32], config: &SensorConfig) -> Self {
        let defaults = DetectionAlgorithmId::Music.default_row();
        let count = |index: usize, min: usize, max: usize| {
            (row_value(row, index, defaults[index]).round().max(0.0) as usize).clamp(min, max)
        };
        let band_width = config.music_max_diags.max(1);
        Self {
            source_width: count(1, MIN_SOURCE_WIDTH, MAX_SOURCE_WIDTH),
            nb_diags: count(2, 1, band_width),
            max_iterations: count(3, 1, MAX_EVD_ITERATIONS),
            history_length: count(4, 1, config.music_max_history.max(1)),
            max_sources: count(5, 0, config.max_detections),
            snr_min: row_value(row, 6, defaults[6]),
            band_width,
        }
    }

    /// Banded autocorrelation of mean-removed captures.
    pub fn autocorrelation(&self, captures: &[Vec<f32>]) -> BandedMatrix {
        let size = captures.iter().map(Vec::len).min().unwrap_or(0);
        let mut matrix = BandedMatrix::zeros(size, self.band_width);
        if captures.is_empty() {
            return matrix;
        }
        let scale = 1.0 / captures.len() as f32;
        let true_diags = self.nb_diags.min(self.band_width);

        for capture in captures {
            let centered = centered(&capture[..size]);
            for i in 0..size {
                for d in 0..true_diags {
                    if i + d >= size {
                        break;
                    }
                    let value = matrix.band(i, d) + scale * centered[i] * centered[i + d];
                    matrix.set_band(i, d, value);
                }
            }
        }

        for i in 0..size {
            let outer = matrix.band(i, true_diags - 1);
            for d in true_diags..self.band_width {
                let factor = DIAGONAL_ATTENUATION[(d - true_diags).min(DIAGONAL_ATTENUATION.len() - 1)];
                matrix.set_band(i, d, factor * outer);
            }
        }
        matrix
    }

    /// Power iteration with deflation; the matrix is consumed by the deflation.
    fn eigen_decomposition(&self, mut matrix: BandedMatrix, count: usize) -> Vec<Eigenpair> {
        let size = matrix.size();
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count.min(size) {
            let mut vector = Array1::<f32>::ones(size);
            for _ in 0..self.max_iterations {
                let next = matrix.multiply(vector.view());
                let peak = next.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
                if peak == 0.0 {
                    vector = next;
                    break;
                }
                vector = next / peak;
            }
            let norm = vector.dot(&vector).sqrt();
            if norm == 0.0 {
                pairs.push(Eigenpair {
                    value: 0.0,
                    vector,
                });
                continue;
            }
            vector /= norm;
            let value = vector.dot(&matrix.multiply(vector.view()));
            matrix.add_outer(vector.view(), -value);
            pairs.push(Eigenpair { value, vector });
        }
        pairs
    }

    fn noise_projector(&self, size: usize, signal: &[Eigenpair]) -> BandedMatrix {
        let mut projector = BandedMatrix::identity(size, self.band_width);
        for pair in signal {
            projector.add_outer(pair.vector.view(), -PROJECTOR_SCALE);
        }
        projector
    }

    fn submodels(&self) -> Vec<Vec<f32>> {
        let sigma = self.source_width as f32 / 2.0;
        (0..PHASE_COUNT)
            .map(|m| KernelHelper::gaussian_pulse(self.source_width, sigma, phase_of(m)))
            .collect()
    }

    fn spectrum_at(projector: &BandedMatrix, model: &[f32], offset: usize) -> f32 {
        1.0 / projector.quadratic_form(model, offset).max(MIN_PROJECTION)
    }

    /// Normalized pseudospectrum, indexed by model offset (center = offset + source_width).
    fn pseudospectrum(&self, projector: &BandedMatrix, centered_model: &[f32]) -> Vec<f32> {
        let size = projector.size();
        if size < centered_model.len() {
            return Vec::new();
        }
        let mut spectrum: Vec<f32> = (0..=size - centered_model.len())
            .map(|offset| Self::spectrum_at(projector, centered_model, offset))
            .collect();
        let top = StatsHelper::max(&spectrum);
        if top > 0.0 {
            spectrum.iter_mut().for_each(|v| *v /= top);
        }
        spectrum
    }

    /// Binary search over the phase submodels between the negative and positive extremes.
    fn refine_phase(projector: &BandedMatrix, models: &[Vec<f32>], offset: usize) -> f32 {
        let level = |m: usize| Self::spectrum_at(projector, &models[m], offset);
        let (mut lo, mut hi) = (0usize, PHASE_COUNT - 1);
        let step = 1.0 / (PHASE_COUNT - 1) as f32;
        while hi - lo > 1 && (hi - lo) as f32 * step > REFINE_PRECISION {
            let mid = (lo + hi) / 2;
            if level(lo) > level(hi) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        let best = if level(lo) >= level(hi) { lo } else { hi };
        phase_of(best)
    }

    /// Runs the full subspace analysis over a set of captures.
    pub fn locate_sources(
        &self,
        captures: &[Vec<f32>],
        max_sources: usize,
    ) -> (Vec<SpectrumPeak>, usize, Vec<f32>) {
        let matrix = self.autocorrelation(captures);
        let size = matrix.size();
        let pairs = self.eigen_decomposition(matrix, max_sources);
        let eigenvalues: Vec<f32> = pairs.iter().map(|p| p.value).collect();
        let source_count = if self.max_sources > 0 {
            self.max_sources.min(pairs.len())
        } else {
            estimate_source_count(&eigenvalues)
        };

        let projector = self.noise_projector(size, &pairs[..source_count]);
        let models = self.submodels();
        let spectrum = self.pseudospectrum(&projector, &models[PHASE_COUNT / 2]);

        let mut peaks = Vec::new();
        for i in 1..spectrum.len().saturating_sub(1) {
            let level = spectrum[i];
            if level > PEAK_LEVEL && level > spectrum[i - 1] && level >= spectrum[i + 1] {
                let phase = Self::refine_phase(&projector, &models, i);
                peaks.push(SpectrumPeak {
                    position: (i + self.source_width) as f32 + phase,
                    level,
                });
            }
        }
        peaks.sort_by(|a, b| b.level.total_cmp(&a.level));
        (peaks, source_count, eigenvalues)
    }

    /// Windowed power at `position` against the quietest sliding window of the tail.
    fn peak_snr(&self, mean_capture: &[f32], position: f32) -> f32 {
        let window = 2 * self.source_width + 1;
        let center = position.round().max(0.0) as usize;
        let lo = center.saturating_sub(self.source_width).min(mean_capture.len());
        let hi = (center + self.source_width + 1).min(mean_capture.len());
        let power = mean_power(&mean_capture[lo..hi]);

        let tail = &mean_capture[mean_capture.len() - mean_capture.len() / 4..];
        let noise = if tail.len() >= window {
            tail.windows(window)
                .map(mean_power)
                .fold(f32::INFINITY, f32::min)
        } else {
            mean_power(tail)
        };
        10.0 * (power / noise.max(MIN_NOISE * MIN_NOISE)).log10()
    }
}

impl Detector for Music {
    fn detect(
        &self,
        input: &DetectionInput<'_>,
        state: &mut DetectorState,
        out: &mut DetectionSet,
    ) -> usize {
        out.clear();
        state.music.push(input.region());
        if state.music.len() < self.history_length {
            return 0;
        }

        let captures = state.music.take();
        let (peaks, source_count, eigenvalues) = self.locate_sources(&captures, out.capacity());
        debug!(
            "music channel {}: {} sources, {} spectrum peaks",
            input.channel,
            source_count,
            peaks.len()
        );
        state.music.last_source_count = Some(source_count);
        state.music.last_eigenvalues = eigenvalues;

        let mean_capture = mean_centered(&captures);
        for peak in peaks {
            let snr = self.peak_snr(&mean_capture, peak.position);
            if snr < self.snr_min {
                continue;
            }
            if !out.push(input.detection(peak.position, snr)) {
                break;
            }
        }
        out.count()
    }
}

fn phase_of(submodel: usize) -> f32 {
    (submodel as f32 - (PHASE_COUNT / 2) as f32) / (PHASE_COUNT - 1) as f32
}

fn centered(capture: &[f32]) -> Vec<f32> {
    let mean = StatsHelper::mean(capture);
    capture.iter().map(|v| v - mean).collect()
}

fn mean_centered(captures: &[Vec<f32>]) -> Vec<f32> {
    let size = captures.iter().map(Vec::len).min().unwrap_or(0);
    let mut mean = vec![0.0; size];
    for capture in captures {
        for (acc, value) in mean.iter_mut().zip(centered(&capture[..size])) {
            *acc += value / captures.len() as f32;
        }
    }
    mean
}

fn mean_power(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(|v| v * v).sum::<f32>() / window.len() as f32
}

/// First index whose eigenvalue is at most half the largest.
pub fn estimate_source_count(eigenvalues: &[f32]) -> usize {
    let largest = StatsHelper::max(eigenvalues);
    if largest <= 0.0 {
        return 0;
    }
    eigenvalues
        .iter()
        .position(|&value| value <= 0.5 * largest)
        .unwrap_or(eigenvalues.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AlgorithmParameterSet;
    use crate::processing::fixtures::echo_signal;
    use crate::processing::DistanceTable;

    fn two_source_frame(seed: u64) -> Vec<f32> {
        echo_signal(1024, &[(300.0, 1000.0, 2.0), (650.0, 850.0, 2.0)], 0.0, seed)
    }

    #[test]
    fn source_count_follows_eigenvalue_decay() {
        assert_eq!(estimate_source_count(&[10.0, 7.0, 4.9, 1.0]), 2);
        assert_eq!(estimate_source_count(&[10.0, 1.0]), 1);
        assert_eq!(estimate_source_count(&[10.0, 9.0, 8.0]), 3);
        assert_eq!(estimate_source_count(&[0.0, 0.0]), 0);
    }

    #[test]
    fn parameters_are_clamped() {
        let config = SensorConfig::default();
        let music = Music::from_row(&[0.0, 40.0, 99.0, 0.0, 64.0, 99.0, 3.0], &config);
        assert_eq!(music.source_width, MAX_SOURCE_WIDTH);
        assert_eq!(music.nb_diags, config.music_max_diags);
        assert_eq!(music.max_iterations, 1);
        assert_eq!(music.history_length, config.music_max_history);
        assert_eq!(music.max_sources, config.max_detections);
    }

    #[test]
    fn phase_grid_spans_half_a_sample_each_way() {
        let phases: Vec<f32> = (0..PHASE_COUNT).map(phase_of).collect();
        assert_eq!(phases[0], -0.5);
        assert_eq!(phases[PHASE_COUNT / 2], 0.0);
        assert_eq!(phases[PHASE_COUNT - 1], 0.5);
    }

    #[test]
    fn waits_for_a_full_history_then_resets() {
        let config = SensorConfig::default();
        let distances = DistanceTable::new(&config);
        let mut params = AlgorithmParameterSet::default();
        params.detection_algorithm = DetectionAlgorithmId::Music;
        let music = Music::from_row(params.active_detection_row(), &config);
        let mut state = DetectorState::default();
        let mut out = DetectionSet::with_capacity(config.max_detections);

        for frame in 0..music.history_length - 1 {
            let signal = two_source_frame(frame as u64);
            let input = DetectionInput::new(0, &signal, &config, &distances, &params);
            assert_eq!(music.detect(&input, &mut state, &mut out), 0);
            assert!(out.as_slice().iter().all(|d| d.is_none()));
            assert_eq!(state.music.len(), frame + 1);
        }
        let signal = two_source_frame(99);
        let input = DetectionInput::new(0, &signal, &config, &distances, &params);
        assert!(music.detect(&input, &mut state, &mut out) > 0);
        assert!(state.music.is_empty());
    }

    #[test]
    fn two_separated_sources_are_located() {
        let config = SensorConfig::default();
        let distances = DistanceTable::new(&config);
        let mut params = AlgorithmParameterSet::default();
        params.detection_algorithm = DetectionAlgorithmId::Music;
        let music = Music::from_row(params.active_detection_row(), &config);
        let mut state = DetectorState::default();
        let mut out = DetectionSet::with_capacity(config.max_detections);

        let mut written = 0;
        for frame in 0..music.history_length {
            let signal = two_source_frame(frame as u64);
            let input = DetectionInput::new(3, &signal, &config, &distances, &params);
            written = music.detect(&input, &mut state, &mut out);
        }

        assert_eq!(state.music.last_source_count(), Some(2));
        assert_eq!(written, 2);
        let tolerance = REFINE_PRECISION * distances.per_sample() + 1e-4;
        for index in [300, 650] {
            let expected = distances.at_index(index);
            assert!(
                out.live().any(|d| (d.distance - expected).abs() <= tolerance),
                "no source near {} in {:?}",
                expected,
                out
            );
        }
    }
}
