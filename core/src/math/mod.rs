pub mod banded;
pub mod kernel;
pub mod snr;
pub mod stats;

pub use banded::BandedMatrix;
pub use kernel::KernelHelper;
pub use snr::SnrHelper;
pub use stats::StatsHelper;
