use serde::{Deserialize, Serialize};

/// TTL value the alpha-beta tracker uses for a free slot.
pub const TTL_UNUSED: i32 = -2;

/// How a track slot stays alive; depends on which tracker owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Liveness {
    #[default]
    Unused,
    /// Alpha-beta countdown. `-1` means expiring: hidden but not yet free.
    Countdown(i32),
    /// Recomputed this cycle by the regression or passthrough trackers.
    Selected,
}

impl Liveness {
    pub fn ttl(&self) -> i32 {
        match self {
            Liveness::Unused => TTL_UNUSED,
            Liveness::Countdown(ttl) => *ttl,
            Liveness::Selected => 0,
        }
    }

    pub fn from_ttl(ttl: i32) -> Self {
        if ttl <= TTL_UNUSED {
            Liveness::Unused
        } else {
            Liveness::Countdown(ttl)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    pub id: u32,
    pub channel: usize,
    pub position: f32,
    pub velocity: f32,
    pub intensity: i32,
    pub confidence: u8,
    pub liveness: Liveness,
}

impl Track {
    pub fn unused(channel: usize) -> Self {
        Self {
            channel,
            ..Default::default()
        }
    }

    pub fn is_unused(&self) -> bool {
        self.liveness == Liveness::Unused
    }

    /// Alive tracks are the ones reported downstream.
    pub fn is_alive(&self) -> bool {
        match self.liveness {
            Liveness::Unused => false,
            Liveness::Countdown(ttl) => ttl >= 0,
            Liveness::Selected => true,
        }
    }
}

/// Externally reported projection of a live track; `id == 0` means "no obstacle".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub channel: usize,
    pub distance: f32,
    pub velocity: f32,
    pub acceleration: f32,
    pub intensity: i32,
    pub confidence: u8,
    pub angle_deg: f32,
    pub angular_width_deg: f32,
}

impl Obstacle {
    pub fn none(channel: usize) -> Self {
        Self {
            channel,
            ..Default::default()
        }
    }

    pub fn from_track(track: &Track) -> Self {
        Self {
            id: track.id,
            channel: track.channel,
            distance: track.position,
            velocity: track.velocity,
            acceleration: 0.0,
            intensity: track.intensity,
            confidence: track.confidence,
            angle_deg: 0.0,
            angular_width_deg: 0.0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.id == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_liveness() {
        assert_eq!(Liveness::from_ttl(-2), Liveness::Unused);
        assert_eq!(Liveness::from_ttl(-1), Liveness::Countdown(-1));
        let mut track = Track::unused(0);
        track.liveness = Liveness::Countdown(-1);
        assert!(!track.is_alive());
        assert!(!track.is_unused());
        track.liveness = Liveness::Countdown(0);
        assert!(track.is_alive());
    }

    #[test]
    fn obstacle_projection_of_unused_track_is_sentinel() {
        let obstacle = Obstacle::none(4);
        assert!(obstacle.is_none());
        assert_eq!(obstacle.channel, 4);
    }
}
