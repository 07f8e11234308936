pub mod detection;
pub mod frame;
pub mod track;

pub use detection::{Detection, DetectionSet};
pub use frame::SampleFrame;
pub use track::{Liveness, Obstacle, Track, TTL_UNUSED};
