//! Vehicle configuration
//!
//! Configuration is plain data handed in by the caller; preset files
//! and UI editing live outside this workspace. Missing fields fall back
//! to the defaults of a typical 125cc rental kart.

use crate::error::ConfigError;
use crate::environment::humid_air_density;
use serde::{Deserialize, Serialize};

/// Chassis parameters, driver included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KartConfig {
    /// Total mass including the driver (kg).
    pub mass_kg: f64,
    /// Frontal area (m²).
    pub frontal_area_m2: f64,
    /// Aerodynamic drag coefficient.
    pub drag_coefficient: f64,
}

impl Default for KartConfig {
    fn default() -> Self {
        Self {
            mass_kg: 175.0,
            frontal_area_m2: 0.5784,
            drag_coefficient: 0.804,
        }
    }
}

/// One reduction stage expressed as tooth counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GearPair {
    pub input: u32,
    pub output: u32,
}

impl GearPair {
    pub fn new(input: u32, output: u32) -> Self {
        Self { input, output }
    }

    pub fn ratio(&self) -> f64 {
        f64::from(self.output) / f64::from(self.input)
    }
}

/// Engine and gearbox parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Crankshaft rotational inertia (kg·m²).
    pub inertia_kgm2: f64,
    /// Fixed reduction between crankshaft and gearbox input.
    pub primary: GearPair,
    /// Selectable gears in order; empty means direct drive.
    pub gears: Vec<GearPair>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inertia_kgm2: 0.003,
            primary: GearPair::new(1, 1),
            gears: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn is_direct_drive(&self) -> bool {
        self.gears.is_empty()
    }
}

/// Tyre geometry and rolling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TyreConfig {
    pub diameter_mm: f64,
    /// Rotational inertia per wheel (kg·m²).
    pub inertia_kgm2: f64,
    /// Constant rolling resistance coefficient.
    pub rolling_c1: f64,
    /// Speed-squared rolling resistance coefficient (s²/m²).
    pub rolling_c2: f64,
}

impl Default for TyreConfig {
    fn default() -> Self {
        Self {
            diameter_mm: 280.0,
            inertia_kgm2: 0.027,
            rolling_c1: 0.03,
            rolling_c2: 1e-5,
        }
    }
}

impl TyreConfig {
    /// Rolling radius (m).
    pub fn radius_m(&self) -> f64 {
        self.diameter_mm / 2000.0
    }
}

/// Chain sprockets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinalDrive {
    pub front_teeth: u32,
    pub rear_teeth: u32,
}

impl Default for FinalDrive {
    fn default() -> Self {
        Self {
            front_teeth: 11,
            rear_teeth: 80,
        }
    }
}

impl FinalDrive {
    pub fn ratio(&self) -> f64 {
        f64::from(self.rear_teeth) / f64::from(self.front_teeth)
    }
}

/// Ambient conditions for the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConditions {
    pub pressure_mbar: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    /// Track grip factor in [0, 1]; carried for the session record.
    pub grip: f64,
}

impl Default for RunConditions {
    fn default() -> Self {
        Self {
            pressure_mbar: 1013.0,
            temperature_c: 20.0,
            humidity_pct: 50.0,
            grip: 0.8,
        }
    }
}

impl RunConditions {
    /// Humid-air density for these conditions (kg/m³).
    pub fn air_density(&self) -> f64 {
        humid_air_density(self.pressure_mbar, self.temperature_c, self.humidity_pct)
    }
}

/// Complete vehicle description consumed by the analysis pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleConfig {
    pub kart: KartConfig,
    pub engine: EngineConfig,
    pub tyre: TyreConfig,
    pub final_drive: FinalDrive,
    pub conditions: RunConditions,
}

impl VehicleConfig {
    /// Check the structural invariants the physics model relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("kart.massKg", self.kart.mass_kg)?;
        positive("kart.frontalAreaM2", self.kart.frontal_area_m2)?;
        positive("tyre.diameterMm", self.tyre.diameter_mm)?;
        teeth("engine.primary", self.engine.primary)?;
        for (i, gear) in self.engine.gears.iter().enumerate() {
            if gear.input == 0 || gear.output == 0 {
                return Err(ConfigError::InvalidTeeth {
                    field: "engine.gears",
                    index: i,
                });
            }
        }
        if self.final_drive.front_teeth == 0 || self.final_drive.rear_teeth == 0 {
            return Err(ConfigError::InvalidTeeth {
                field: "finalDrive",
                index: 0,
            });
        }
        if !(0.0..=1.0).contains(&self.conditions.grip) {
            return Err(ConfigError::OutOfRange {
                field: "conditions.grip",
                value: self.conditions.grip,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Per-run acceptance window for the logger power engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineLimits {
    pub min_rpm: f64,
    pub max_rpm: f64,
    /// Samples computing to more wheel power than this are dropped as
    /// measurement artefacts.
    pub max_power_cv: f64,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            min_rpm: 4000.0,
            max_rpm: 16000.0,
            max_power_cv: 100.0,
        }
    }
}

impl EngineLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("limits.minRpm", self.min_rpm)?;
        positive("limits.maxRpm", self.max_rpm)?;
        positive("limits.maxPowerCv", self.max_power_cv)?;
        if self.min_rpm >= self.max_rpm {
            return Err(ConfigError::InvalidRpmWindow {
                min: self.min_rpm,
                max: self.max_rpm,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn teeth(field: &'static str, pair: GearPair) -> Result<(), ConfigError> {
    if pair.input == 0 || pair.output == 0 {
        Err(ConfigError::InvalidTeeth { field, index: 0 })
    } else {
        Ok(())
    }
}
