//! Curve Engine
//!
//! Groups accepted samples into fixed-width engine-speed or
//! vehicle-speed bins, smooths the resulting curves and summarises
//! them.

mod binning;
mod smoothing;
mod statistics;

pub use binning::{
    bin_by_rpm, bin_by_speed, RpmBin, RpmSample, SpeedBin, SpeedSample, MIN_SPEED_BIN_SAMPLES,
    RPM_BIN_WIDTH, SPEED_BIN_WIDTH_KMH,
};
pub use smoothing::{moving_average, savitzky_golay, smooth_curve, smooth_rpm_bins};
pub use statistics::{curve_statistics, CurveStatistics};
