use crate::math::snr::SnrHelper;
use crate::math::stats::StatsHelper;
use crate::processing::{DetectionInput, Detector, DetectorState};
use crate::sensor_interface::{Detection, DetectionSet};

/// Samples skipped past the first peak's shoulder before the secondary search.
const SKIP_MARGIN: usize = 4;
const SNR_HALF_WIDTH: usize = 3;

/// Global maximum plus one secondary maximum beyond the first peak's shoulder.
///
/// Only slots 0 and 1 are written; the rest of the set is left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MaxPeak;

impl Detector for MaxPeak {
    fn detect(
        &self,
        input: &DetectionInput<'_>,
        _state: &mut DetectorState,
        out: &mut DetectionSet,
    ) -> usize {
        let region = input.region();
        let Some((first, _)) = StatsHelper::argmax(region) else {
            out.set(0, Detection::NONE);
            out.set(1, Detection::NONE);
            return 0;
        };

        let mean = StatsHelper::mean(region);
        let shoulder = mean + StatsHelper::standard_deviation(region, mean);
        let noise = input.noise_floor();

        let mut end = first;
        while end < region.len() && region[end] > shoulder {
            end += 1;
        }
        let skip = (end + SKIP_MARGIN).min(region.len());

        let primary = SnrHelper::snr_at_detection(region, first, SNR_HALF_WIDTH, noise);
        out.set(0, input.detection(first as f32, primary));

        let secondary = StatsHelper::argmax(&region[skip..])
            .filter(|&(_, value)| value > shoulder)
            .map(|(idx, _)| {
                let idx = skip + idx;
                let snr = SnrHelper::snr_at_detection(region, idx, SNR_HALF_WIDTH, noise);
                input.detection(idx as f32, snr)
            })
            .unwrap_or(Detection::NONE);
        out.set(1, secondary);

        out.as_slice()
            .iter()
            .take(2)
            .filter(|d| !d.is_none())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::processing::fixtures::{echo_signal, run};
    use crate::processing::{DetectionAlgorithm, DistanceTable};

    #[test]
    fn reports_primary_then_secondary_peak() {
        let config = SensorConfig::default();
        let table = DistanceTable::new(&config);
        let signal = echo_signal(1024, &[(300.0, 900.0, 2.0), (600.0, 500.0, 2.0)], 3.0, 1);
        let algo = DetectionAlgorithm::MaxPeak(MaxPeak);
        let out = run(&algo, &signal, &config, &mut DetectorState::default());
        let first = out.get(0).unwrap();
        let second = out.get(1).unwrap();
        assert!((first.distance - table.at_index(300)).abs() <= table.per_sample());
        assert!((second.distance - table.at_index(600)).abs() <= table.per_sample());
        assert!(first.intensity > second.intensity);
        assert!(out.count() <= 2);
    }

    #[test]
    fn secondary_needs_to_clear_the_shoulder() {
        let config = SensorConfig::default();
        let signal = echo_signal(1024, &[(500.0, 900.0, 2.0)], 0.0, 0);
        let algo = DetectionAlgorithm::MaxPeak(MaxPeak);
        let out = run(&algo, &signal, &config, &mut DetectorState::default());
        assert_eq!(out.count(), 1);
        assert!(out.get(1).unwrap().is_none());
    }

    #[test]
    fn slots_beyond_two_are_not_touched() {
        let config = SensorConfig::default();
        let distances = DistanceTable::new(&config);
        let params = crate::params::AlgorithmParameterSet::default();
        let signal = echo_signal(1024, &[(500.0, 900.0, 2.0)], 0.0, 0);
        let input = DetectionInput::new(0, &signal, &config, &distances, &params);
        let mut out = DetectionSet::with_capacity(4);
        out.set(3, Detection::new(9.0, 9));
        MaxPeak.detect(&input, &mut DetectorState::default(), &mut out);
        assert_eq!(out.get(3).unwrap().distance, 9.0);
    }
}
