//! Ranging core for the time-of-flight obstacle sensor.
//!
//! Each channel frame flows through the selected detection algorithm, into the
//! channel's detection history, then through the selected tracker. Obstacles
//! are projected from the resulting track slots on demand.

pub mod channel;
pub mod config;
pub mod math;
pub mod params;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod projection;
pub mod sensor_interface;
pub mod telemetry;
pub mod tracking;

pub use channel::ChannelContext;
pub use pipeline::{ParameterTarget, SensorCore};
pub use prelude::{CoreError, CoreResult, FrameSummary};
