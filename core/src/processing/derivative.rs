//! Step-derivative chain shared by the DoubleWave and DoubleDerivate detectors.

use crate::math::kernel::KernelHelper;
use crate::math::snr::SnrHelper;
use crate::math::stats::StatsHelper;

/// Highest derivative order either detector accepts.
pub const MAX_DERIVATIVE_ORDER: usize = 16;

pub fn clamp_order(raw: f32) -> usize {
    (raw.round().max(1.0) as usize).min(MAX_DERIVATIVE_ORDER)
}

/// Echo summit found on the first-derivative stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Fractional position inside the processed region.
    pub position: f32,
    /// `position` rounded to the nearest sample.
    pub index: usize,
    /// Aligned second-derivative value; more negative is a sharper echo.
    pub curvature: f32,
}

#[derive(Debug, Clone)]
pub struct DerivativeChain {
    pub first: Vec<f32>,
    pub second: Vec<f32>,
    pub first_order: usize,
    pub second_order: usize,
}

impl DerivativeChain {
    pub fn compute(region: &[f32], first_order: usize, second_order: usize) -> Self {
        let first = KernelHelper::convolution(
            region,
            &KernelHelper::derivative_step_kernel(first_order),
        );
        let second =
            KernelHelper::convolution(&first, &KernelHelper::derivative_step_kernel(second_order));
        Self {
            first,
            second,
            first_order,
            second_order,
        }
    }

    /// Negative-to-non-negative sign changes of the first stage whose aligned
    /// second-stage value lies below `threshold * min(second)`. Sorted sharpest first.
    pub fn candidates(&self, threshold: f32) -> Vec<Candidate> {
        let floor = StatsHelper::min(&self.second);
        if floor >= 0.0 {
            return Vec::new();
        }
        let limit = threshold * floor;
        let d1 = &self.first;
        let len = d1.len();

        // Both stages need full kernel support before a crossing is trusted.
        let settled = 2 * self.first_order + self.second_order.max(1);

        let mut found = Vec::new();
        for n in settled..len {
            if !(d1[n - 1] < 0.0 && d1[n] >= 0.0) {
                continue;
            }
            let aligned = n + self.second_order;
            if aligned >= len || self.second[aligned] >= limit {
                continue;
            }
            let before = if n >= 2 { d1[n - 2] } else { d1[n - 1] };
            let after = if n + 1 < len { d1[n + 1] } else { d1[n] };
            let t = SnrHelper::interpolate_crossing(before, d1[n - 1], d1[n], after);
            let position = (n - 1) as f32 + t - self.first_order as f32;
            if position < 0.0 {
                continue;
            }
            found.push(Candidate {
                position,
                index: position.round() as usize,
                curvature: self.second[aligned],
            });
        }
        found.sort_by(|a, b| a.curvature.total_cmp(&b.curvature));
        found
    }

    /// RMS of the last quarter of the second stage.
    pub fn tail_rms(&self) -> f32 {
        let tail = &self.second[self.second.len() - self.second.len() / 4..];
        StatsHelper::rms(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_pulse_yields_single_centered_candidate() {
        let region: Vec<f32> = (0..200)
            .map(|i| {
                let z = (i as f32 - 80.0) / 2.5;
                500.0 * (-0.5 * z * z).exp()
            })
            .collect();
        let chain = DerivativeChain::compute(&region, 3, 3);
        let candidates = chain.candidates(0.3);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].position - 80.0).abs() < 0.5);
        assert_eq!(candidates[0].index, 80);
    }

    #[test]
    fn flat_region_has_no_candidates() {
        let chain = DerivativeChain::compute(&[5.0; 64], 2, 2);
        assert!(chain.candidates(0.3).is_empty());
    }

    #[test]
    fn order_is_clamped() {
        assert_eq!(clamp_order(0.0), 1);
        assert_eq!(clamp_order(3.4), 3);
        assert_eq!(clamp_order(99.0), MAX_DERIVATIVE_ORDER);
    }
}
