use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tofcore::config::SensorConfig;

/// One moving reflector seen by a single channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub channel: usize,
    pub start_distance_m: f32,
    /// Positive values move away from the sensor.
    pub speed_mps: f32,
    /// Depth of the notch in raw counts.
    pub amplitude: f32,
    /// Gaussian sigma of the echo, in samples.
    pub width_samples: f32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            channel: 3,
            start_distance_m: 150.0,
            speed_mps: -5.0,
            amplitude: 2000.0,
            width_samples: 2.0,
        }
    }
}

/// Synthetic waveform scenario for every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub baseline: f32,
    /// Raw counts added per sample index.
    pub baseline_slope: f32,
    pub noise: f32,
    pub seed: u64,
    pub targets: Vec<TargetConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            baseline: 0.0,
            baseline_slope: 1.0,
            noise: 4.0,
            seed: 0,
            targets: vec![TargetConfig::default()],
        }
    }
}

/// Renders raw channel frames: baseline ramp minus Gaussian notches, plus seeded noise.
pub struct ProfileGenerator {
    scenario: ScenarioConfig,
    rng: StdRng,
    distance_per_sample: f32,
    system_offset_m: f32,
    frame_period: f32,
    samples_per_frame: usize,
}

impl ProfileGenerator {
    pub fn new(scenario: ScenarioConfig, sensor: &SensorConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(scenario.seed),
            distance_per_sample: sensor.distance_per_sample(),
            system_offset_m: sensor.system_offset_m,
            frame_period: sensor.frame_period(),
            samples_per_frame: sensor.samples_per_frame,
            scenario,
        }
    }

    /// Sample index where a target sits at `frame`.
    pub fn target_index(&self, target: &TargetConfig, frame: usize) -> f32 {
        let distance = target.start_distance_m + target.speed_mps * self.frame_period * frame as f32;
        (distance - self.system_offset_m) / self.distance_per_sample
    }

    pub fn frame(&mut self, channel: usize, frame: usize) -> Vec<i32> {
        let centers: Vec<(f32, f32, f32)> = self
            .scenario
            .targets
            .iter()
            .filter(|target| target.channel == channel)
            .map(|target| {
                (
                    self.target_index(target, frame),
                    target.amplitude,
                    target.width_samples.max(0.5),
                )
            })
            .collect();

        let noise = self.scenario.noise;
        (0..self.samples_per_frame)
            .map(|i| {
                let x = i as f32;
                let echo: f32 = centers
                    .iter()
                    .map(|&(center, amplitude, sigma)| {
                        let z = (x - center) / sigma;
                        amplitude * (-0.5 * z * z).exp()
                    })
                    .sum();
                let jitter = if noise > 0.0 {
                    self.rng.gen_range(-noise..noise)
                } else {
                    0.0
                };
                (self.scenario.baseline + self.scenario.baseline_slope * x - echo + jitter).round()
                    as i32
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notch_sits_at_the_target_distance() {
        let sensor = SensorConfig::default();
        let scenario = ScenarioConfig {
            noise: 0.0,
            ..Default::default()
        };
        let mut generator = ProfileGenerator::new(scenario.clone(), &sensor);
        let target = &scenario.targets[0];
        let expected = generator.target_index(target, 0).round() as usize;

        let samples = generator.frame(target.channel, 0);
        assert_eq!(samples.len(), sensor.samples_per_frame);
        let deepest = samples
            .iter()
            .enumerate()
            .map(|(i, &s)| (i, s - i as i32))
            .min_by_key(|&(_, residual)| residual)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(deepest, expected);
    }

    #[test]
    fn other_channels_only_see_the_baseline() {
        let sensor = SensorConfig::default();
        let scenario = ScenarioConfig {
            noise: 0.0,
            ..Default::default()
        };
        let mut generator = ProfileGenerator::new(scenario, &sensor);
        let samples = generator.frame(0, 0);
        assert!(samples.iter().enumerate().all(|(i, &s)| s == i as i32));
    }

    #[test]
    fn targets_move_with_their_speed() {
        let sensor = SensorConfig::default();
        let generator = ProfileGenerator::new(ScenarioConfig::default(), &sensor);
        let target = TargetConfig {
            speed_mps: 10.0,
            ..Default::default()
        };
        let start = generator.target_index(&target, 0);
        let later = generator.target_index(&target, 100);
        let moved = (later - start) * sensor.distance_per_sample();
        assert!((moved - 10.0).abs() < 1e-3);
    }
}
