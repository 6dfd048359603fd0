//! UI widgets for the meter suite.

mod correlation_meter;
mod lufs_readout;
mod ppm_bar;

pub use correlation_meter::CorrelationMeterWidget;
pub use lufs_readout::LufsReadoutWidget;
pub use ppm_bar::PpmBarWidget;
