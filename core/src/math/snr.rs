//! Noise-floor and signal-to-noise estimators shared by the detection bank.

use crate::math::stats::StatsHelper;

/// Samples in the pre-signal window never exceed this count.
pub const NOISE_WINDOW_MAX: usize = 30;

/// Floor applied to noise estimates so SNR stays finite on clean signals.
pub const MIN_NOISE: f32 = 1e-6;

pub struct SnrHelper;

impl SnrHelper {
    /// Standard deviation of the first `min(30, acquisitionDelay - deadZone - 1)` samples.
    ///
    /// `None` when that window holds fewer than two samples.
    pub fn noise_from_pre_signal(
        signal: &[f32],
        dead_zone: usize,
        acquisition_delay: usize,
    ) -> Option<f32> {
        let len = acquisition_delay
            .saturating_sub(dead_zone + 1)
            .min(NOISE_WINDOW_MAX)
            .min(signal.len());
        if len < 2 {
            return None;
        }
        let window = &signal[..len];
        Some(StatsHelper::standard_deviation(
            window,
            StatsHelper::mean(window),
        ))
    }

    /// Standard deviation of the last samples of the frame.
    pub fn noise_from_tail(signal: &[f32]) -> f32 {
        let window = &signal[signal.len().saturating_sub(NOISE_WINDOW_MAX)..];
        StatsHelper::standard_deviation(window, StatsHelper::mean(window))
    }

    /// Pre-signal noise when available, tail noise otherwise; never below [`MIN_NOISE`].
    pub fn noise_floor(signal: &[f32], dead_zone: usize, acquisition_delay: usize) -> f32 {
        Self::noise_from_pre_signal(signal, dead_zone, acquisition_delay)
            .unwrap_or_else(|| Self::noise_from_tail(signal))
            .max(MIN_NOISE)
    }

    /// `20*log10(stdDev(window)/noise)` over `[index - half_width, index + half_width]`.
    pub fn snr_at_detection(signal: &[f32], index: usize, half_width: usize, noise: f32) -> f32 {
        if signal.is_empty() {
            return 0.0;
        }
        let index = index.min(signal.len() - 1);
        let lo = index.saturating_sub(half_width);
        let hi = (index + half_width + 1).min(signal.len());
        let window = &signal[lo..hi];
        let spread = StatsHelper::standard_deviation(window, StatsHelper::mean(window));
        20.0 * (spread.max(MIN_NOISE) / noise.max(MIN_NOISE)).log10()
    }

    /// Fixed linear remap from SNR (dB) to the reported intensity score.
    pub fn intensity_from_snr(snr: f32) -> i32 {
        (2.0 * (snr + 21.0)).round() as i32
    }

    /// Fractional offset in [0, 1] of a sign change between `y0` and `y1`.
    ///
    /// Two families of linear estimators are formed: the bracket secant paired
    /// with the extrapolation from the left pair, and the bracket secant paired
    /// with the extrapolation from the right pair. The family whose members
    /// agree best wins and its mean is returned.
    pub fn interpolate_crossing(y_minus1: f32, y0: f32, y1: f32, y2: f32) -> f32 {
        let bracket = if y0 != y1 { y0 / (y0 - y1) } else { 0.5 };
        let left_slope = y0 - y_minus1;
        let forward = if left_slope != 0.0 {
            -y0 / left_slope
        } else {
            bracket
        };
        let right_slope = y2 - y1;
        let backward = if right_slope != 0.0 {
            1.0 - y1 / right_slope
        } else {
            bracket
        };

        let spread_left = (bracket - forward).abs();
        let spread_right = (bracket - backward).abs();
        let estimate = if spread_left <= spread_right {
            0.5 * (bracket + forward)
        } else {
            0.5 * (bracket + backward)
        };
        estimate.clamp(0.0, 1.0)
    }
}
