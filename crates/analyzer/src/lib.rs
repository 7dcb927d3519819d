//! Analysis Pipeline
//!
//! Wires the decoder, physics model, binner and calibration engine
//! into the two entry points callers use: logger-file analysis and
//! sensor-mode analysis. The pipeline holds no state; every call takes
//! its full configuration and returns an owned document.

mod document;
mod error;
mod pipeline;

pub use document::{
    AnalysisDocument, ConfigSummary, LapSummary, LapTrace, SensorDocument,
};
pub use error::{AnalysisError, ErrorKind};
pub use pipeline::{analyze_csv, analyze_sensor, analyze_telemetry, AnalysisSettings};

// Callers assemble inputs from these building blocks.
pub use curve_engine::{CurveStatistics, RpmBin, SpeedBin};
pub use log_decoder::{
    decode, extract_laps, materialize, Channel, ChannelMap, DecodedLog, Lap, SessionMetadata,
    Telemetry,
};
pub use motion_calib::{
    Calibration, CalibrationError, CalibrationPhase, Calibrator, GpsFix, MotionSample,
    SensorCurve, SensorDynoConfig, SensorStatistics,
};
pub use power_model::{
    EngineConfig, EngineLimits, FinalDrive, GearPair, KartConfig, RunConditions, TyreConfig,
    VehicleConfig,
};
