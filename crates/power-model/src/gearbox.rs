//! Gear detection from the rpm / wheel-speed ratio
//!
//! The engaged gear is whichever candidate ratio best explains the
//! observed crankshaft-to-wheel speed ratio. A match farther than 15%
//! from every candidate means the clutch is slipping, the kart is
//! coasting or the data is noise, and no gear is reported.

use crate::config::{EngineConfig, FinalDrive, TyreConfig};

/// Maximum relative error between the observed and a candidate ratio.
pub const GEAR_MATCH_TOLERANCE: f64 = 0.15;

/// Below this wheel speed the ratio is numerically meaningless.
pub const MIN_DETECT_SPEED_MS: f64 = 1.0;

/// Precomputed drivetrain ratios for one vehicle.
#[derive(Debug, Clone)]
pub struct Drivetrain {
    /// Crank-to-wheel ratio per gear, 1-based gear = index + 1.
    total_ratios: Vec<f64>,
    wheel_radius_m: f64,
    direct_drive: bool,
}

impl Drivetrain {
    pub fn new(engine: &EngineConfig, final_drive: &FinalDrive, tyre: &TyreConfig) -> Self {
        let primary = engine.primary.ratio();
        let final_ratio = final_drive.ratio();
        let total_ratios = if engine.is_direct_drive() {
            vec![primary * final_ratio]
        } else {
            engine
                .gears
                .iter()
                .map(|gear| primary * gear.ratio() * final_ratio)
                .collect()
        };
        Self {
            total_ratios,
            wheel_radius_m: tyre.radius_m(),
            direct_drive: engine.is_direct_drive(),
        }
    }

    pub fn is_direct_drive(&self) -> bool {
        self.direct_drive
    }

    pub fn gear_count(&self) -> usize {
        if self.direct_drive {
            0
        } else {
            self.total_ratios.len()
        }
    }

    /// Crank-to-wheel ratio for a 1-based gear.
    pub fn total_ratio(&self, gear: u8) -> Option<f64> {
        if gear == 0 {
            return None;
        }
        self.total_ratios.get(usize::from(gear) - 1).copied()
    }

    /// Infer the engaged gear from engine speed and wheel speed.
    ///
    /// Returns the 1-based gear, or 0 when nothing matches within
    /// tolerance. Direct-drive engines always report gear 1 once the
    /// kart is moving.
    pub fn detect_gear(&self, rpm: f64, speed_ms: f64) -> u8 {
        if speed_ms < MIN_DETECT_SPEED_MS {
            return 0;
        }
        if self.direct_drive {
            return 1;
        }

        let engine_rad_s = rpm * std::f64::consts::PI / 30.0;
        let wheel_rad_s = speed_ms / self.wheel_radius_m;
        let observed = engine_rad_s / wheel_rad_s;

        let mut best_gear = 0u8;
        let mut best_error = GEAR_MATCH_TOLERANCE;
        for (i, ratio) in self.total_ratios.iter().enumerate() {
            let error = (observed - ratio).abs() / ratio;
            if error < best_error {
                best_error = error;
                best_gear = (i + 1) as u8;
            }
        }
        best_gear
    }
}
