//! Kart Power Model
//!
//! Vehicle configuration, humid-air density, gear detection and the
//! per-sample wheel force/power/torque computation for logger data.

mod config;
mod engine;
mod environment;
mod error;
mod gearbox;

pub use config::{
    EngineConfig, EngineLimits, FinalDrive, GearPair, KartConfig, RunConditions, TyreConfig,
    VehicleConfig,
};
pub use engine::{compute_samples, EngineInput, SamplePoint, CV_WATTS, STANDARD_GRAVITY};
pub use environment::humid_air_density;
pub use error::ConfigError;
pub use gearbox::{Drivetrain, GEAR_MATCH_TOLERANCE, MIN_DETECT_SPEED_MS};
