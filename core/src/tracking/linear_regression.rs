//! History-window tracker.
//!
//! Chains of gated detections are rebuilt from the history ring every cycle,
//! ranked by confidence, and fitted with a least-squares line whose value at
//! the current frame becomes the track.

use crate::math::snr::SnrHelper;
use crate::params::{row_value, TrackingAlgorithmId};
use crate::processing::DetectionHistory;
use crate::sensor_interface::{Detection, Liveness, Track};
use crate::tracking::{Tracker, TrackingInput, TrackingReport};
use log::trace;

/// Intensity that maps to a confidence of 1.
const CONFIDENCE_SCALE: f32 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegression {
    pub max_distance_delta: f32,
    pub max_intensity_delta: f32,
    pub min_snr_to_track: f32,
}

/// One candidate chain; `entries[age]` is the detection picked `age` frames back.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub head: usize,
    pub entries: Vec<Option<Detection>>,
}

impl Chain {
    /// Entries up to the oldest populated one.
    fn span(&self) -> usize {
        self.entries
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |last| last + 1)
    }

    fn populated(&self) -> impl Iterator<Item = &Detection> {
        self.entries.iter().flatten()
    }

    pub fn confidence(&self) -> f32 {
        let (sum, count) = self
            .populated()
            .fold((0.0, 0usize), |(sum, count), d| {
                (sum + d.intensity as f32 / CONFIDENCE_SCALE, count + 1)
            });
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }

    pub fn mean_intensity(&self) -> f32 {
        self.confidence() * CONFIDENCE_SCALE
    }

    /// Distances over the span, gaps filled linearly from the neighbours.
    pub fn interpolated_distances(&self) -> Vec<f32> {
        let span = self.span();
        let mut distances = vec![0.0; span];
        let mut previous: Option<(usize, f32)> = None;
        for (age, entry) in self.entries[..span].iter().enumerate() {
            let Some(detection) = entry else { continue };
            distances[age] = detection.distance;
            if let Some((from, start)) = previous {
                let steps = (age - from) as f32;
                for gap in from + 1..age {
                    let t = (gap - from) as f32 / steps;
                    distances[gap] = start + t * (detection.distance - start);
                }
            }
            previous = Some((age, detection.distance));
        }
        distances
    }

    /// Least-squares fit of distance against frame time (0 = now, -1 = previous, ...).
    /// Returns the fitted distance at time 0 and the slope per frame.
    pub fn fit(&self) -> (f32, f32) {
        let distances = self.interpolated_distances();
        let n = distances.len() as f32;
        if distances.len() < 2 {
            return (distances.first().copied().unwrap_or(0.0), 0.0);
        }
        let t_mean = -(n - 1.0) / 2.0;
        let d_mean = distances.iter().sum::<f32>() / n;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (age, &d) in distances.iter().enumerate() {
            let dt = -(age as f32) - t_mean;
            sxy += dt * (d - d_mean);
            sxx += dt * dt;
        }
        let slope = sxy / sxx;
        (d_mean - slope * t_mean, slope)
    }
}

impl LinearRegression {
    pub fn from_row(row: &[f32]) -> Self {
        let defaults = TrackingAlgorithmId::LinearRegression.default_row();
        Self {
            max_distance_delta: row_value(row, 0, defaults[0]),
            max_intensity_delta: row_value(row, 1, defaults[1]),
            min_snr_to_track: row_value(row, 2, defaults[2]),
        }
    }

    fn gated(&self, a: &Detection, b: &Detection) -> bool {
        (a.distance - b.distance).abs() <= self.max_distance_delta
            && ((a.intensity - b.intensity).abs() as f32) <= self.max_intensity_delta
    }

    /// Builds every chain headed by a gated pair between the two most recent frames.
    pub fn build_chains(&self, history: &DetectionHistory) -> Vec<Chain> {
        let depth = history.depth().min(history.frames_recorded());
        let (Some(current), Some(previous)) = (history.frame_back(0), history.frame_back(1)) else {
            return Vec::new();
        };
        if depth < 2 {
            return Vec::new();
        }

        let mut chains = Vec::new();
        for (head, d0) in current.as_slice().iter().enumerate() {
            if d0.is_none() {
                continue;
            }
            for d1 in previous.live().filter(|d1| self.gated(d0, d1)) {
                let mut entries = vec![None; depth];
                entries[0] = Some(*d0);
                entries[1] = Some(*d1);
                let mut reference = *d1;
                for (age, entry) in entries.iter_mut().enumerate().skip(2) {
                    let nearest = history.frame_back(age).and_then(|frame| {
                        frame
                            .live()
                            .filter(|d| self.gated(&reference, d))
                            .min_by(|a, b| {
                                (a.distance - reference.distance)
                                    .abs()
                                    .total_cmp(&(b.distance - reference.distance).abs())
                            })
                            .copied()
                    });
                    if let Some(found) = nearest {
                        *entry = Some(found);
                        reference = found;
                    }
                }
                chains.push(Chain { head, entries });
            }
        }
        chains
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::from_row(TrackingAlgorithmId::LinearRegression.default_row())
    }
}

impl Tracker for LinearRegression {
    fn update(&self, input: &TrackingInput<'_>, tracks: &mut [Track]) -> TrackingReport {
        let previous: Vec<Track> = tracks.to_vec();
        tracks.fill(Track::unused(input.channel));

        let mut chains = self.build_chains(input.history);
        chains.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
        let min_intensity = SnrHelper::intensity_from_snr(self.min_snr_to_track) as f32;

        let mut report = TrackingReport::default();
        let mut used_heads = Vec::new();
        let mut slot = 0;
        for chain in &chains {
            if slot >= tracks.len() {
                break;
            }
            if used_heads.contains(&chain.head) {
                continue;
            }
            used_heads.push(chain.head);

            if chain.mean_intensity() < min_intensity {
                trace!(
                    "channel {} slot {} skipped: mean intensity {:.1}",
                    input.channel,
                    slot,
                    chain.mean_intensity()
                );
                slot += 1;
                continue;
            }

            let (position, slope) = chain.fit();
            let prior = &previous[slot];
            let id = if prior.is_alive()
                && (prior.position - position).abs() <= self.max_distance_delta
            {
                prior.id
            } else {
                report.created += 1;
                input.ids.next_id()
            };
            let head = chain.entries[0].unwrap_or_default();
            tracks[slot] = Track {
                id,
                channel: input.channel,
                position,
                velocity: slope * input.config.frame_rate_hz,
                intensity: head.intensity,
                confidence: (chain.confidence() * 100.0).round().min(100.0) as u8,
                liveness: Liveness::Selected,
            };
            slot += 1;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::sensor_interface::DetectionSet;
    use crate::tracking::fixtures::{detections, slots};
    use crate::tracking::TrackIdAllocator;

    fn feed(history: &mut DetectionHistory, config: &SensorConfig, frames: &[Vec<(f32, i32)>]) {
        for entries in frames {
            history.record(&detections(config, entries));
        }
    }

    fn run(
        tracker: &LinearRegression,
        history: &DetectionHistory,
        config: &SensorConfig,
        ids: &TrackIdAllocator,
        tracks: &mut [Track],
    ) -> TrackingReport {
        let latest = history
            .frame_back(0)
            .cloned()
            .unwrap_or_else(|| DetectionSet::with_capacity(config.max_detections));
        let input = TrackingInput {
            channel: 1,
            detections: &latest,
            history,
            config,
            ids,
        };
        tracker.update(&input, tracks)
    }

    #[test]
    fn linear_motion_is_recovered() {
        let config = SensorConfig::default();
        let mut history = DetectionHistory::new(config.historic_size, config.max_detections);
        let frames: Vec<Vec<(f32, i32)>> = (0..8)
            .map(|k| vec![(5.0 + 0.02 * k as f32, 80)])
            .collect();
        feed(&mut history, &config, &frames);

        let ids = TrackIdAllocator::new();
        let mut tracks = slots(&config, 1);
        let report = run(&LinearRegression::default(), &history, &config, &ids, &mut tracks);

        assert_eq!(report.created, 1);
        let track = tracks[0];
        assert_eq!(track.liveness, Liveness::Selected);
        assert!((track.position - 5.14).abs() < 1e-4, "{}", track.position);
        assert!((track.velocity - 2.0).abs() < 1e-2, "{}", track.velocity);
        assert_eq!(track.confidence, 100);
        assert!(tracks[1..].iter().all(Track::is_unused));
    }

    #[test]
    fn gaps_inside_a_chain_are_interpolated() {
        let chain = Chain {
            head: 0,
            entries: vec![
                Some(Detection::new(4.0, 60)),
                Some(Detection::new(3.0, 60)),
                None,
                Some(Detection::new(1.0, 60)),
                None,
            ],
        };
        assert_eq!(chain.interpolated_distances(), vec![4.0, 3.0, 2.0, 1.0]);
        let (position, slope) = chain.fit();
        assert!((position - 4.0).abs() < 1e-5);
        assert!((slope - 1.0).abs() < 1e-5);
        assert!((chain.confidence() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn weak_chain_leaves_its_slot_empty() {
        let config = SensorConfig::default();
        let mut history = DetectionHistory::new(config.historic_size, config.max_detections);
        let frames: Vec<Vec<(f32, i32)>> = (0..4)
            .map(|_| vec![(20.0, 90), (8.0, 20)])
            .collect();
        feed(&mut history, &config, &frames);

        let ids = TrackIdAllocator::new();
        let mut tracks = slots(&config, 1);
        run(&LinearRegression::default(), &history, &config, &ids, &mut tracks);

        assert!(tracks[0].is_alive());
        assert!((tracks[0].position - 20.0).abs() < 1e-5);
        assert!(tracks[1].is_unused());
        assert!(tracks[2].is_unused());
    }

    #[test]
    fn nearby_track_keeps_its_id_across_cycles() {
        let config = SensorConfig::default();
        let tracker = LinearRegression::default();
        let ids = TrackIdAllocator::new();
        let mut history = DetectionHistory::new(config.historic_size, config.max_detections);
        let mut tracks = slots(&config, 1);

        feed(&mut history, &config, &[vec![(7.0, 70)], vec![(7.05, 70)]]);
        run(&tracker, &history, &config, &ids, &mut tracks);
        let id = tracks[0].id;

        feed(&mut history, &config, &[vec![(7.1, 70)]]);
        let report = run(&tracker, &history, &config, &ids, &mut tracks);
        assert_eq!(report.created, 0);
        assert_eq!(tracks[0].id, id);
    }

    #[test]
    fn one_frame_of_history_yields_no_tracks() {
        let config = SensorConfig::default();
        let mut history = DetectionHistory::new(config.historic_size, config.max_detections);
        feed(&mut history, &config, &[vec![(3.0, 90)]]);
        let ids = TrackIdAllocator::new();
        let mut tracks = slots(&config, 1);
        run(&LinearRegression::default(), &history, &config, &ids, &mut tracks);
        assert!(tracks.iter().all(Track::is_unused));
    }
}
