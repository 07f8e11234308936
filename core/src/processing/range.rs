use crate::config::SensorConfig;

/// Precomputed sample-index -> distance conversion (`x_distance`).
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTable {
    per_sample: f32,
    x_distance: Vec<f32>,
}

impl DistanceTable {
    pub fn new(config: &SensorConfig) -> Self {
        let per_sample = config.distance_per_sample();
        let x_distance = (0..config.samples_per_frame)
            .map(|i| i as f32 * per_sample)
            .collect();
        Self {
            per_sample,
            x_distance,
        }
    }

    pub fn per_sample(&self) -> f32 {
        self.per_sample
    }

    pub fn at_index(&self, index: usize) -> f32 {
        self.x_distance
            .get(index)
            .copied()
            .unwrap_or(index as f32 * self.per_sample)
    }

    /// Distance at a fractional sample position.
    pub fn at(&self, position: f32) -> f32 {
        let base = position.floor().max(0.0);
        self.at_index(base as usize) + (position - base) * self.per_sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_table_is_round_trip_scaled() {
        let config = SensorConfig::default();
        let table = DistanceTable::new(&config);
        let expected = 512.0 * config.sampling_period_s * 299_792_458.0 / 2.0;
        assert!((table.at_index(512) - expected).abs() < 1e-3);
        assert!((table.at(10.5) - 10.5 * table.per_sample()).abs() < 1e-4);
    }
}
