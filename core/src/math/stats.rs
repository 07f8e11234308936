pub struct StatsHelper;

impl StatsHelper {
    pub fn min(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn mean(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f32>() / samples.len() as f32
    }

    pub fn min_i32(samples: &[i32]) -> i32 {
        samples.iter().copied().min().unwrap_or(0)
    }

    pub fn max_i32(samples: &[i32]) -> i32 {
        samples.iter().copied().max().unwrap_or(0)
    }

    pub fn mean_i32(samples: &[i32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: i64 = samples.iter().map(|&v| v as i64).sum();
        sum as f32 / samples.len() as f32
    }

    /// Index and value of the first maximum.
    pub fn argmax(samples: &[f32]) -> Option<(usize, f32)> {
        samples
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (idx, value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((idx, value)),
            })
    }

    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }

    pub fn standard_deviation(samples: &[f32], mean: f32) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|&v| (v - mean) * (v - mean)).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }
}
