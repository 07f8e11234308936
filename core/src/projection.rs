//! Obstacle projection: one record per track slot, rebuilt every cycle.

use crate::sensor_interface::{Obstacle, Track};

pub struct ObstacleProjection;

impl ObstacleProjection {
    /// Projects one channel's slots; dead slots yield the "no obstacle" record.
    pub fn project_channel(channel: usize, tracks: &[Track]) -> Vec<Obstacle> {
        tracks
            .iter()
            .map(|track| {
                if track.is_alive() {
                    Obstacle::from_track(track)
                } else {
                    Obstacle::none(channel)
                }
            })
            .collect()
    }

    pub fn project<'a, I>(channels: I) -> Vec<Obstacle>
    where
        I: IntoIterator<Item = (usize, &'a [Track])>,
    {
        channels
            .into_iter()
            .flat_map(|(channel, tracks)| Self::project_channel(channel, tracks))
            .collect()
    }
}
