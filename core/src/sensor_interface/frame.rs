use crate::config::SensorConfig;
use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Raw samples for one channel and frame, with the configured frame length enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFrame {
    channel: usize,
    samples: Vec<i32>,
}

impl SampleFrame {
    pub fn new(channel: usize, samples: Vec<i32>, config: &SensorConfig) -> CoreResult<Self> {
        if channel >= config.channel_count {
            return Err(CoreError::UnknownChannel {
                channel,
                channel_count: config.channel_count,
            });
        }
        if samples.len() != config.samples_per_frame {
            return Err(CoreError::FrameLength {
                expected: config.samples_per_frame,
                actual: samples.len(),
            });
        }
        Ok(Self { channel, samples })
    }

    pub fn from_slice(channel: usize, samples: &[i32], config: &SensorConfig) -> CoreResult<Self> {
        Self::new(channel, samples.to_vec(), config)
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    /// The receiver inverts its output; echoes come back as notches.
    /// Negating once here lets every algorithm look for positive lobes.
    pub fn echo_signal(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| -(s as f32)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length_is_enforced() {
        let config = SensorConfig::default();
        let err = SampleFrame::new(0, vec![0; 10], &config).unwrap_err();
        assert_eq!(
            err,
            CoreError::FrameLength {
                expected: 1024,
                actual: 10
            }
        );
    }

    #[test]
    fn channel_is_enforced() {
        let config = SensorConfig::default();
        let err = SampleFrame::new(7, vec![0; 1024], &config).unwrap_err();
        assert!(matches!(err, CoreError::UnknownChannel { channel: 7, .. }));
    }

    #[test]
    fn echo_signal_is_negated() {
        let config = SensorConfig::default();
        let mut samples = vec![0; 1024];
        samples[3] = -25;
        let frame = SampleFrame::new(1, samples, &config).unwrap();
        assert_eq!(frame.echo_signal()[3], 25.0);
        assert_eq!(frame.channel(), 1);
    }
}
