use crate::params::{row_value, TrackingAlgorithmId};
use crate::sensor_interface::{Liveness, Track};
use crate::tracking::{Tracker, TrackingInput, TrackingReport};

/// Position/velocity filter with a per-slot TTL.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaBeta {
    pub alpha: f32,
    pub beta: f32,
    /// TTL given to a slot on every match.
    pub persistence: i32,
}

impl AlphaBeta {
    pub fn from_row(row: &[f32]) -> Self {
        let defaults = TrackingAlgorithmId::AlphaBeta.default_row();
        Self {
            alpha: row_value(row, 0, defaults[0]),
            beta: row_value(row, 1, defaults[1]),
            persistence: row_value(row, 2, defaults[2]).round().max(0.0) as i32,
        }
    }

    /// Folds a measurement into a slot predicted over `dt`.
    pub fn correct(&self, track: &mut Track, measured: f32, dt: f32) {
        let predicted = track.position + track.velocity * dt;
        let residual = measured - predicted;
        track.position = predicted + self.alpha * residual;
        track.velocity += self.beta * residual / dt;
    }

    fn confidence(&self, ttl: i32) -> u8 {
        (100 * ttl.max(0) / self.persistence.max(1)).min(100) as u8
    }
}

impl Default for AlphaBeta {
    fn default() -> Self {
        Self::from_row(TrackingAlgorithmId::AlphaBeta.default_row())
    }
}

impl Tracker for AlphaBeta {
    fn update(&self, input: &TrackingInput<'_>, tracks: &mut [Track]) -> TrackingReport {
        let dt = input.config.frame_period();
        let tunnel = input.config.valid_tunnel();
        let mut report = TrackingReport::default();

        for track in tracks.iter_mut() {
            if track.is_unused() {
                continue;
            }
            track.liveness = Liveness::from_ttl(track.liveness.ttl() - 1);
            if track.is_unused() {
                *track = Track::unused(input.channel);
            }
        }

        let mut matched = vec![false; tracks.len()];
        for detection in input.detections.live() {
            let nearest = tracks
                .iter()
                .enumerate()
                .filter(|(slot, track)| !track.is_unused() && !matched[*slot])
                .map(|(slot, track)| {
                    let predicted = track.position + track.velocity * dt;
                    (slot, (predicted - detection.distance).abs())
                })
                .filter(|&(_, gap)| gap <= tunnel)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((slot, _)) = nearest {
                let track = &mut tracks[slot];
                self.correct(track, detection.distance, dt);
                track.intensity = detection.intensity;
                track.liveness = Liveness::Countdown(self.persistence);
                matched[slot] = true;
                continue;
            }

            match tracks.iter().position(Track::is_unused) {
                Some(slot) => {
                    tracks[slot] = Track {
                        id: input.ids.next_id(),
                        channel: input.channel,
                        position: detection.distance,
                        velocity: 0.0,
                        intensity: detection.intensity,
                        confidence: 0,
                        liveness: Liveness::Countdown(0),
                    };
                    matched[slot] = true;
                    report.created += 1;
                }
                None => report.dropped += 1,
            }
        }

        for track in tracks.iter_mut().filter(|t| !t.is_unused()) {
            track.confidence = self.confidence(track.liveness.ttl());
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::processing::DetectionHistory;
    use crate::sensor_interface::TTL_UNUSED;
    use crate::tracking::fixtures::{detections, slots};
    use crate::tracking::TrackIdAllocator;

    struct Bench {
        config: SensorConfig,
        history: DetectionHistory,
        ids: TrackIdAllocator,
        tracks: Vec<Track>,
        tracker: AlphaBeta,
    }

    impl Bench {
        fn new() -> Self {
            let config = SensorConfig::default();
            Self {
                history: DetectionHistory::new(config.historic_size, config.max_detections),
                tracks: slots(&config, 2),
                ids: TrackIdAllocator::new(),
                tracker: AlphaBeta::default(),
                config,
            }
        }

        fn cycle(&mut self, entries: &[(f32, i32)]) -> TrackingReport {
            let set = detections(&self.config, entries);
            let input = TrackingInput {
                channel: 2,
                detections: &set,
                history: &self.history,
                config: &self.config,
                ids: &self.ids,
            };
            self.tracker.update(&input, &mut self.tracks)
        }
    }

    #[test]
    fn oscillating_detection_keeps_its_id() {
        let mut bench = Bench::new();
        let tunnel = bench.config.valid_tunnel();
        bench.cycle(&[(10.0, 60)]);
        let id = bench.tracks[0].id;
        assert_ne!(id, 0);
        for k in 0..20 {
            let wobble = if k % 2 == 0 { 0.4 } else { -0.4 } * tunnel;
            bench.cycle(&[(10.0 + wobble, 60)]);
            assert_eq!(bench.tracks[0].id, id);
            assert!(bench.tracks[0].is_alive());
            assert!(bench.tracks[1..].iter().all(Track::is_unused));
        }
    }

    #[test]
    fn vanished_detection_coasts_then_frees_its_slot() {
        let mut bench = Bench::new();
        bench.cycle(&[(12.0, 50)]);
        bench.cycle(&[(12.0, 50)]);
        assert_eq!(bench.tracks[0].liveness, Liveness::Countdown(5));
        assert_eq!(bench.tracks[0].confidence, 100);

        for ttl in (0..5).rev() {
            bench.cycle(&[]);
            assert_eq!(bench.tracks[0].liveness.ttl(), ttl);
            assert!(bench.tracks[0].is_alive());
        }

        // Expiring slot is hidden but not handed to a new detection.
        bench.cycle(&[(30.0, 50)]);
        assert_eq!(bench.tracks[0].liveness.ttl(), -1);
        assert!(!bench.tracks[0].is_alive());
        assert_eq!(bench.tracks[1].position, 30.0);

        bench.cycle(&[]);
        assert_eq!(bench.tracks[0].liveness.ttl(), TTL_UNUSED);
        assert_eq!(bench.tracks[0].id, 0);
    }

    #[test]
    fn update_follows_alpha_beta_equations() {
        let tracker = AlphaBeta::default();
        let mut track = Track {
            position: 10.0,
            velocity: 1.0,
            liveness: Liveness::Countdown(3),
            ..Track::unused(0)
        };
        tracker.correct(&mut track, 10.2, 0.01);
        // predicted 10.01, residual 0.19
        assert!((track.position - (10.01 + 0.5 * 0.19)).abs() < 1e-5);
        assert!((track.velocity - (1.0 + 0.2 * 0.19 / 0.01)).abs() < 1e-3);
    }

    #[test]
    fn detections_without_a_free_slot_are_dropped() {
        let mut bench = Bench::new();
        let entries: Vec<(f32, i32)> = (0..8).map(|k| (5.0 + 5.0 * k as f32, 40)).collect();
        let report = bench.cycle(&entries);
        assert_eq!(report.created, 8);

        bench.tracks.truncate(4);
        let report = bench.cycle(&[(100.0, 40), (5.0, 40)]);
        assert_eq!(report.created, 0);
        assert_eq!(report.dropped, 1);
        assert_eq!(bench.tracks[0].liveness, Liveness::Countdown(5));
    }

    #[test]
    fn a_slot_matches_at_most_one_detection_per_cycle() {
        let mut bench = Bench::new();
        bench.cycle(&[(8.0, 40)]);
        let report = bench.cycle(&[(8.0, 40), (8.1, 40)]);
        assert_eq!(report.created, 1);
        assert_eq!(bench.tracks.iter().filter(|t| t.is_alive()).count(), 2);
    }
}
