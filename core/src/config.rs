use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Speed of light in vacuum, m/s.
pub const LIGHTSPEED: f32 = 299_792_458.0;

/// Shortest processing window (after the acquisition delay) a frame must offer.
pub const MIN_PROCESSING_SAMPLES: usize = 64;

/// Static sensor configuration shared by every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub channel_count: usize,
    pub samples_per_frame: usize,
    pub max_detections: usize,
    pub historic_size: usize,
    pub max_tracks_per_channel: usize,
    /// Leading blanked samples.
    pub dead_zone: usize,
    /// Samples acquired before the emitted pulse leaves the sensor.
    pub acquisition_delay: usize,
    pub sampling_period_s: f32,
    pub system_offset_m: f32,
    pub frame_rate_hz: f32,
    pub max_object_speed_mps: f32,
    pub music_max_diags: usize,
    pub music_max_history: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            channel_count: 7,
            samples_per_frame: 1024,
            max_detections: 8,
            historic_size: 8,
            max_tracks_per_channel: 8,
            dead_zone: 0,
            acquisition_delay: 40,
            sampling_period_s: 1.0 / 180.0e6,
            system_offset_m: 0.0,
            frame_rate_hz: 100.0,
            max_object_speed_mps: 50.0,
            music_max_diags: 24,
            music_max_history: 16,
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.channel_count == 0 {
            return Err(CoreError::InvalidConfig("channel_count must be > 0".into()));
        }
        if self.max_detections == 0 || self.historic_size == 0 {
            return Err(CoreError::InvalidConfig(
                "max_detections and historic_size must be > 0".into(),
            ));
        }
        if self.max_tracks_per_channel == 0 {
            return Err(CoreError::InvalidConfig(
                "max_tracks_per_channel must be > 0".into(),
            ));
        }
        let required = self.processing_start() + MIN_PROCESSING_SAMPLES;
        if self.samples_per_frame < required {
            return Err(CoreError::InvalidConfig(format!(
                "samples_per_frame {} shorter than processing window {}",
                self.samples_per_frame, required
            )));
        }
        if !(self.sampling_period_s > 0.0) || !(self.frame_rate_hz > 0.0) {
            return Err(CoreError::InvalidConfig(
                "sampling_period_s and frame_rate_hz must be positive".into(),
            ));
        }
        if self.max_object_speed_mps < 0.0 {
            return Err(CoreError::InvalidConfig(
                "max_object_speed_mps must not be negative".into(),
            ));
        }
        if self.music_max_diags == 0 || self.music_max_history == 0 {
            return Err(CoreError::InvalidConfig(
                "music_max_diags and music_max_history must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// First sample index handed to the detection algorithms.
    pub fn processing_start(&self) -> usize {
        self.acquisition_delay.saturating_sub(self.dead_zone)
    }

    /// Length of the pre-signal window used for noise estimation.
    pub fn noise_window_len(&self) -> usize {
        self.acquisition_delay
            .saturating_sub(self.dead_zone + 1)
            .min(30)
    }

    /// Round-trip distance covered by one sample period.
    pub fn distance_per_sample(&self) -> f32 {
        self.sampling_period_s * LIGHTSPEED / 2.0
    }

    pub fn frame_period(&self) -> f32 {
        1.0 / self.frame_rate_hz
    }

    /// Largest distance an object may move between two frames.
    pub fn valid_tunnel(&self) -> f32 {
        self.max_object_speed_mps / self.frame_rate_hz
    }

    pub fn max_detections_in_historic(&self) -> usize {
        self.max_detections * self.historic_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SensorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.processing_start(), 40);
        assert_eq!(config.noise_window_len(), 30);
        assert_eq!(config.max_detections_in_historic(), 64);
    }

    #[test]
    fn valid_tunnel_follows_speed_and_rate() {
        let config = SensorConfig {
            frame_rate_hz: 20.0,
            max_object_speed_mps: 10.0,
            ..Default::default()
        };
        assert!((config.valid_tunnel() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn short_frame_is_rejected() {
        let config = SensorConfig {
            samples_per_frame: 80,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn noise_window_saturates_when_delay_is_small() {
        let config = SensorConfig {
            acquisition_delay: 0,
            ..Default::default()
        };
        assert_eq!(config.noise_window_len(), 0);
        assert_eq!(config.processing_start(), 0);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: SensorConfig =
            serde_json::from_str(r#"{"channel_count": 2, "dead_zone": 5}"#).unwrap();
        assert_eq!(config.channel_count, 2);
        assert_eq!(config.dead_zone, 5);
        assert_eq!(config.samples_per_frame, 1024);
    }
}
