//! Result documents
//!
//! Everything the pipeline returns is plain serialisable data with
//! camelCase keys, ready for the UI layer.

use chrono::{DateTime, Utc};
use curve_engine::{CurveStatistics, RpmBin, SpeedBin};
use motion_calib::SensorStatistics;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-lap telemetry traces, time rebased to the lap start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapTrace {
    pub lap: usize,
    pub lap_time_s: f64,
    pub is_out_lap: bool,
    pub is_in_lap: bool,
    /// Whether this lap was part of the analysed selection.
    pub selected: bool,
    pub time_s: Vec<f64>,
    pub speed_kmh: Vec<f64>,
    pub rpm: Vec<f64>,
    pub gear: Vec<u8>,
    /// Coarse inertial power estimate per sample (CV).
    pub power_cv: Vec<f64>,
}

/// Session lap statistics over the timed laps (out/in laps excluded).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapSummary {
    pub lap_count: usize,
    pub timed_lap_count: usize,
    pub best_lap_s: f64,
    pub mean_lap_s: f64,
}

/// Echo of the configuration an analysis actually used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub mass_kg: f64,
    pub gear_count: usize,
    pub direct_drive: bool,
    pub final_drive_ratio: f64,
    pub tyre_diameter_mm: f64,
    pub air_density: f64,
    pub track_grip: f64,
    pub min_rpm: f64,
    pub max_rpm: f64,
    pub max_power_cv: f64,
    pub filter_level: f64,
}

/// Complete result of a logger-file analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDocument {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Smoothed power/torque curve over engine speed.
    pub bins: Vec<RpmBin>,
    /// Accepted samples behind the curve.
    pub accepted_samples: usize,
    pub statistics: CurveStatistics,
    pub laps: Vec<LapTrace>,
    pub lap_summary: LapSummary,
    pub configuration: ConfigSummary,
}

/// Complete result of a sensor-mode analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDocument {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub curve: Vec<SpeedBin>,
    pub statistics: SensorStatistics,
    pub calibration_quality: f64,
}
