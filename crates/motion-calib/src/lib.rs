//! Motion Calibration and Sensor Dyno
//!
//! Derives the device→kart rotation from stationary and
//! driving-straight accelerometer windows, then turns GPS-timed motion
//! samples into a power-versus-speed curve.

mod calibration;
mod dyno;
mod error;
mod sample;

pub use calibration::{
    Calibration, CalibrationPhase, Calibrator, FORWARD_PHASE_MIN_SAMPLES,
    GRAVITY_PHASE_MIN_SAMPLES,
};
pub use dyno::{compute_speed_curve, SensorCurve, SensorDynoConfig, SensorStatistics};
pub use error::CalibrationError;
pub use sample::{GpsFix, MotionSample};
