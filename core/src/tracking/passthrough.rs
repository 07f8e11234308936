use crate::sensor_interface::{Liveness, Track};
use crate::tracking::{Tracker, TrackingInput, TrackingReport};

/// "No tracking": every detection becomes a one-frame track with a slot-derived id.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Passthrough;

impl Passthrough {
    pub fn track_id(channel: usize, max_tracks: usize, index: usize) -> u32 {
        (channel * max_tracks + index + 1) as u32
    }
}

impl Tracker for Passthrough {
    fn update(&self, input: &TrackingInput<'_>, tracks: &mut [Track]) -> TrackingReport {
        tracks.fill(Track::unused(input.channel));
        let max_tracks = input.config.max_tracks_per_channel;
        let limit = input.config.max_detections.min(max_tracks).min(tracks.len());

        let mut report = TrackingReport::default();
        for (index, detection) in input.detections.as_slice().iter().enumerate().take(limit) {
            if detection.is_none() {
                continue;
            }
            tracks[index] = Track {
                id: Self::track_id(input.channel, max_tracks, index),
                channel: input.channel,
                position: detection.distance,
                velocity: 0.0,
                intensity: detection.intensity,
                confidence: 100,
                liveness: Liveness::Selected,
            };
            report.created += 1;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::processing::DetectionHistory;
    use crate::tracking::fixtures::{detections, slots};
    use crate::tracking::TrackIdAllocator;

    #[test]
    fn detections_map_to_fixed_ids() {
        let config = SensorConfig {
            max_tracks_per_channel: 2,
            ..Default::default()
        };
        let set = detections(&config, &[(3.0, 40), (4.5, 55), (9.0, 61)]);
        let history = DetectionHistory::new(config.historic_size, config.max_detections);
        let ids = TrackIdAllocator::new();
        let mut tracks = slots(&config, 3);
        let input = TrackingInput {
            channel: 3,
            detections: &set,
            history: &history,
            config: &config,
            ids: &ids,
        };

        let report = Passthrough.update(&input, &mut tracks);
        assert_eq!(report.created, 2);
        assert_eq!(tracks[0].id, 7);
        assert_eq!(tracks[1].id, 8);
        assert_eq!(tracks[1].position, 4.5);
        assert_eq!(tracks[1].velocity, 0.0);
        assert!(tracks.iter().all(Track::is_alive));
        // the allocator is untouched
        assert_eq!(ids.next_id(), 1);
    }
}
