//! Convolution and the kernels the detection bank builds on.

use std::f32::consts::PI;

pub struct KernelHelper;

impl KernelHelper {
    /// Causal convolution, zero-padded on the left. Output length equals input length.
    pub fn convolution(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
        (0..signal.len())
            .map(|n| {
                kernel
                    .iter()
                    .take(n + 1)
                    .enumerate()
                    .map(|(k, &tap)| tap * signal[n - k])
                    .sum()
            })
            .collect()
    }

    /// `2*order+1` taps: -1 for the first `order`, 0 in the center, +1 for the last `order`.
    ///
    /// Convolved causally this yields (older sum - recent sum), delayed by `order`.
    pub fn derivative_step_kernel(order: usize) -> Vec<f32> {
        let mut kernel = vec![0.0; 2 * order + 1];
        kernel[..order].fill(-1.0);
        kernel[order + 1..].fill(1.0);
        kernel
    }

    /// Log-normal density; zero for `x <= 0`.
    pub fn log_normal_pulse(x: f32, mu: f32, sigma: f32) -> f32 {
        if x <= 0.0 || sigma <= 0.0 {
            return 0.0;
        }
        let shifted = x.ln() - mu;
        (-(shifted * shifted) / (2.0 * sigma * sigma)).exp() / (x * sigma * (2.0 * PI).sqrt())
    }

    /// Antisymmetric derivative kernel whose taps are weighted by a log-normal
    /// of the distance to the center. Same sign convention and delay
    /// (`half_width`) as [`KernelHelper::derivative_step_kernel`].
    pub fn log_normal_derivative_kernel(half_width: usize, damping: f32) -> Vec<f32> {
        (0..=2 * half_width)
            .map(|k| {
                let lag = k as f32 - half_width as f32;
                lag.signum() * Self::log_normal_pulse(lag.abs(), 0.0, damping)
            })
            .collect()
    }

    /// Positive half-period sine lobe over `2*half_width+1` taps; delay `half_width`.
    pub fn sine_lobe(half_width: usize) -> Vec<f32> {
        let span = (2 * half_width + 2) as f32;
        (0..=2 * half_width)
            .map(|k| (PI * (k + 1) as f32 / span).sin())
            .collect()
    }

    /// Gaussian pulse of `2*half_width+1` taps centered at `half_width + phase`,
    /// scaled to unit Euclidean norm.
    pub fn gaussian_pulse(half_width: usize, sigma: f32, phase: f32) -> Vec<f32> {
        let center = half_width as f32 + phase;
        let mut pulse: Vec<f32> = (0..=2 * half_width)
            .map(|k| {
                let z = (k as f32 - center) / sigma;
                (-0.5 * z * z).exp()
            })
            .collect();
        let norm = pulse.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            pulse.iter_mut().for_each(|v| *v /= norm);
        }
        pulse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convolution_is_causal_and_length_preserving() {
        let out = KernelHelper::convolution(&[1.0, 2.0, 3.0], &[1.0, 1.0]);
        assert_eq!(out, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn derivative_step_kernel_layout() {
        assert_eq!(
            KernelHelper::derivative_step_kernel(2),
            vec![-1.0, -1.0, 0.0, 1.0, 1.0]
        );
    }

    #[test]
    fn derivative_of_rising_ramp_is_negative_constant() {
        let ramp: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let out = KernelHelper::convolution(&ramp, &KernelHelper::derivative_step_kernel(2));
        // older - recent over two taps each side: -(1+2) - (2+1) = -6
        assert!(out[10..].iter().all(|&v| (v + 6.0).abs() < 1e-6));
    }

    #[test]
    fn log_normal_is_zero_at_and_below_origin() {
        assert_eq!(KernelHelper::log_normal_pulse(0.0, 0.0, 1.0), 0.0);
        assert_eq!(KernelHelper::log_normal_pulse(-1.0, 0.0, 1.0), 0.0);
        let peak = KernelHelper::log_normal_pulse(1.0, 0.0, 1.0);
        assert!((peak - 1.0 / (2.0 * PI).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn log_normal_derivative_kernel_is_antisymmetric() {
        let kernel = KernelHelper::log_normal_derivative_kernel(4, 0.5);
        assert_eq!(kernel.len(), 9);
        assert_eq!(kernel[4], 0.0);
        for k in 0..4 {
            assert_eq!(kernel[k], -kernel[8 - k]);
            assert!(kernel[k] <= 0.0);
        }
    }

    #[test]
    fn gaussian_pulse_has_unit_norm() {
        let pulse = KernelHelper::gaussian_pulse(4, 2.0, 0.25);
        let norm: f32 = pulse.iter().map(|v| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(pulse[4] > pulse[3]);
    }
}
