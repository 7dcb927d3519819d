//! Logger power engine
//!
//! Converts each accepted telemetry sample into wheel force, power and
//! torque using the full inertial + drag + rolling model. Braking and
//! out-of-window samples are dropped; the survivors feed the rpm
//! binner downstream.

use crate::config::{EngineLimits, VehicleConfig};
use crate::gearbox::Drivetrain;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Standard gravity (m/s²), used to convert g readings to m/s².
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Metric horsepower in watts.
pub const CV_WATTS: f64 = 735.5;

/// Samples slower than this (km/h) carry no usable power signal.
const MIN_SAMPLE_SPEED_KMH: f64 = 5.0;

/// Borrowed channel views for one engine pass.
///
/// Optional channels may be empty; their values read as zero.
#[derive(Debug, Clone, Copy)]
pub struct EngineInput<'a> {
    pub rpm: &'a [f64],
    pub speed_kmh: &'a [f64],
    pub lon_acc_g: &'a [f64],
    pub head_temp: &'a [f64],
    pub water_temp: &'a [f64],
    pub exhaust_temp: &'a [f64],
    pub lambda: &'a [f64],
}

/// One accepted sample with its computed wheel output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePoint {
    pub rpm: f64,
    pub speed_kmh: f64,
    pub power_cv: f64,
    pub torque_nm: f64,
    pub gear: u8,
    pub head_temp: f64,
    pub water_temp: f64,
    pub exhaust_temp: f64,
    pub lambda: f64,
    /// Lap the sample belongs to.
    pub lap: usize,
    /// Index within the lap.
    pub index: usize,
}

/// Run the wheel-output model over the selected lap ranges.
///
/// `selections` pairs each lap index with its half-open sample range.
/// Samples are visited in order, so identical inputs produce identical
/// floating-point output.
pub fn compute_samples(
    input: &EngineInput<'_>,
    selections: &[(usize, Range<usize>)],
    config: &VehicleConfig,
    limits: &EngineLimits,
    drivetrain: &Drivetrain,
    air_density: f64,
) -> Vec<SamplePoint> {
    let mass = config.kart.mass_kg;
    let area = config.kart.frontal_area_m2;
    let cd = config.kart.drag_coefficient;
    let radius = config.tyre.radius_m();
    let tyre_inertia = config.tyre.inertia_kgm2;
    let engine_inertia = config.engine.inertia_kgm2;
    let c1 = config.tyre.rolling_c1;
    let c2 = config.tyre.rolling_c2;

    let mut accepted = Vec::new();
    for (lap, range) in selections {
        for i in range.clone() {
            if i >= input.speed_kmh.len() || i >= input.rpm.len() || i >= input.lon_acc_g.len() {
                break;
            }
            let speed_ms = input.speed_kmh[i] / 3.6;
            let accel = input.lon_acc_g[i] * STANDARD_GRAVITY;
            let rpm = input.rpm[i];

            if speed_ms < MIN_SAMPLE_SPEED_KMH / 3.6 {
                continue;
            }
            // Braking or coasting: the engine is not the force source.
            if accel <= 0.0 {
                continue;
            }
            if rpm < limits.min_rpm || rpm > limits.max_rpm {
                continue;
            }
            let gear = drivetrain.detect_gear(rpm, speed_ms);
            if gear == 0 {
                continue;
            }
            let Some(total_ratio) = drivetrain.total_ratio(gear) else {
                continue;
            };

            let drag = 0.5 * air_density * area * cd * speed_ms * speed_ms;
            let rolling = mass * STANDARD_GRAVITY * (c1 + c2 * speed_ms * speed_ms);
            let linear = mass * accel;
            let wheel_spin = accel / radius;
            // Two driven wheels on the live axle.
            let wheels = 2.0 * tyre_inertia * wheel_spin / radius;
            let engine = engine_inertia * wheel_spin * total_ratio * total_ratio / radius;

            let force = linear + drag + rolling + wheels + engine;
            let power_w = force * speed_ms;
            let power_cv = power_w / CV_WATTS;
            if power_cv < 0.0 || power_cv > limits.max_power_cv {
                continue;
            }

            accepted.push(SamplePoint {
                rpm,
                speed_kmh: input.speed_kmh[i],
                power_cv,
                torque_nm: force * radius,
                gear,
                head_temp: value_or_zero(input.head_temp, i),
                water_temp: value_or_zero(input.water_temp, i),
                exhaust_temp: value_or_zero(input.exhaust_temp, i),
                lambda: value_or_zero(input.lambda, i),
                lap: *lap,
                index: i - range.start,
            });
        }
    }
    accepted
}

fn value_or_zero(channel: &[f64], i: usize) -> f64 {
    channel.get(i).copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, FinalDrive, GearPair, TyreConfig};

    fn direct_drive_config() -> VehicleConfig {
        VehicleConfig {
            engine: EngineConfig {
                primary: GearPair::new(10, 10),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Constant-acceleration straight: v = 5 + 2t, a = 2 m/s².
    fn synthetic_input(n: usize, dt: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let config = direct_drive_config();
        let drivetrain = Drivetrain::new(&config.engine, &config.final_drive, &config.tyre);
        let ratio = drivetrain.total_ratio(1).unwrap();
        let radius = config.tyre.radius_m();

        let mut rpm = Vec::with_capacity(n);
        let mut speed = Vec::with_capacity(n);
        let mut acc = Vec::with_capacity(n);
        for i in 0..n {
            let v = 5.0 + 2.0 * (i as f64) * dt;
            let wheel_rad_s = v / radius;
            rpm.push(wheel_rad_s * ratio * 30.0 / std::f64::consts::PI);
            speed.push(v * 3.6);
            acc.push(2.0 / STANDARD_GRAVITY);
        }
        (rpm, speed, acc)
    }

    #[test]
    fn test_constant_acceleration_run_accepted() {
        let (rpm, speed, acc) = synthetic_input(1000, 0.01);
        let config = direct_drive_config();
        let drivetrain = Drivetrain::new(&config.engine, &config.final_drive, &config.tyre);
        let limits = EngineLimits {
            min_rpm: 1000.0,
            max_rpm: 20000.0,
            max_power_cv: 100.0,
        };
        let input = EngineInput {
            rpm: &rpm,
            speed_kmh: &speed,
            lon_acc_g: &acc,
            head_temp: &[],
            water_temp: &[],
            exhaust_temp: &[],
            lambda: &[],
        };

        let samples = compute_samples(&input, &[(0, 0..1000)], &config, &limits, &drivetrain, 1.225);
        assert!(samples.len() >= 80, "only {} accepted", samples.len());
        assert!(samples.iter().all(|s| s.gear == 1));
        assert!(samples.iter().all(|s| s.power_cv > 0.0));
        assert!(samples.iter().all(|s| s.power_cv <= 100.0));
        assert!(samples.iter().all(|s| s.head_temp == 0.0));
    }

    #[test]
    fn test_power_grows_with_speed_under_constant_acceleration() {
        let (rpm, speed, acc) = synthetic_input(500, 0.01);
        let config = direct_drive_config();
        let drivetrain = Drivetrain::new(&config.engine, &config.final_drive, &config.tyre);
        let limits = EngineLimits {
            min_rpm: 1000.0,
            max_rpm: 20000.0,
            max_power_cv: 100.0,
        };
        let input = EngineInput {
            rpm: &rpm,
            speed_kmh: &speed,
            lon_acc_g: &acc,
            head_temp: &[],
            water_temp: &[],
            exhaust_temp: &[],
            lambda: &[],
        };
        let samples = compute_samples(&input, &[(0, 0..500)], &config, &limits, &drivetrain, 1.225);

        // Every force term is non-decreasing in v here, so P = F·v must
        // grow monotonically along the run.
        for pair in samples.windows(2) {
            assert!(pair[1].power_cv > pair[0].power_cv);
        }
    }

    #[test]
    fn test_braking_and_slow_samples_rejected() {
        let config = direct_drive_config();
        let drivetrain = Drivetrain::new(&config.engine, &config.final_drive, &config.tyre);
        let limits = EngineLimits {
            min_rpm: 1000.0,
            max_rpm: 20000.0,
            max_power_cv: 100.0,
        };
        let rpm = vec![9000.0, 9000.0, 9000.0];
        let speed = vec![60.0, 60.0, 3.0]; // last one crawls
        let acc = vec![0.2, -0.3, 0.2]; // middle one brakes
        let input = EngineInput {
            rpm: &rpm,
            speed_kmh: &speed,
            lon_acc_g: &acc,
            head_temp: &[],
            water_temp: &[],
            exhaust_temp: &[],
            lambda: &[],
        };
        let samples = compute_samples(&input, &[(0, 0..3)], &config, &limits, &drivetrain, 1.225);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].index, 0);
    }

    #[test]
    fn test_rpm_window_enforced() {
        let config = direct_drive_config();
        let drivetrain = Drivetrain::new(&config.engine, &config.final_drive, &config.tyre);
        let limits = EngineLimits {
            min_rpm: 8000.0,
            max_rpm: 15000.0,
            max_power_cv: 100.0,
        };
        let rpm = vec![7000.0, 9000.0, 15500.0];
        let speed = vec![60.0, 60.0, 60.0];
        let acc = vec![0.2, 0.2, 0.2];
        let input = EngineInput {
            rpm: &rpm,
            speed_kmh: &speed,
            lon_acc_g: &acc,
            head_temp: &[],
            water_temp: &[],
            exhaust_temp: &[],
            lambda: &[],
        };
        let samples = compute_samples(&input, &[(0, 0..3)], &config, &limits, &drivetrain, 1.225);
        assert_eq!(samples.len(), 1);
        assert!((samples[0].rpm - 9000.0).abs() < 1e-9);
    }

    #[test]
    fn test_power_cap_drops_outliers() {
        let config = direct_drive_config();
        let drivetrain = Drivetrain::new(&config.engine, &config.final_drive, &config.tyre);
        let limits = EngineLimits {
            min_rpm: 1000.0,
            max_rpm: 50000.0,
            max_power_cv: 100.0,
        };
        // 200 km/h at 1 g would compute far beyond 100 CV.
        let rpm = vec![28885.0];
        let speed = vec![200.0];
        let acc = vec![1.0];
        let input = EngineInput {
            rpm: &rpm,
            speed_kmh: &speed,
            lon_acc_g: &acc,
            head_temp: &[],
            water_temp: &[],
            exhaust_temp: &[],
            lambda: &[],
        };
        let samples = compute_samples(&input, &[(0, 0..1)], &config, &limits, &drivetrain, 1.225);
        assert!(samples.is_empty());

        // Raising the configurable cap lets the same sample through.
        let relaxed = EngineLimits {
            max_power_cv: 1000.0,
            ..limits
        };
        let samples = compute_samples(&input, &[(0, 0..1)], &config, &relaxed, &drivetrain, 1.225);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_limit_regimes() {
        let config = direct_drive_config();
        let drivetrain = Drivetrain::new(&config.engine, &config.final_drive, &config.tyre);
        let limits = EngineLimits {
            min_rpm: 1000.0,
            max_rpm: 50000.0,
            max_power_cv: 1000.0,
        };

        // Inertia-dominated: low speed, strong acceleration. The m·a·v
        // term should carry almost all of the power.
        let v = 6.0;
        let a_g = 0.8;
        let rpm = vec![12000.0];
        let speed = vec![v * 3.6];
        let acc = vec![a_g];
        let input = EngineInput {
            rpm: &rpm,
            speed_kmh: &speed,
            lon_acc_g: &acc,
            head_temp: &[],
            water_temp: &[],
            exhaust_temp: &[],
            lambda: &[],
        };
        let samples = compute_samples(&input, &[(0, 0..1)], &config, &limits, &drivetrain, 1.225);
        let inertial_cv = config.kart.mass_kg * a_g * STANDARD_GRAVITY * v / CV_WATTS;
        assert!((samples[0].power_cv - inertial_cv) / inertial_cv < 0.15);

        // Drag-dominated: high speed, barely accelerating. Power should
        // sit close to the pure aero + rolling estimate.
        let v = 45.0;
        let a_g = 0.01;
        let rpm = vec![23000.0];
        let speed = vec![v * 3.6];
        let acc = vec![a_g];
        let input = EngineInput {
            rpm: &rpm,
            speed_kmh: &speed,
            lon_acc_g: &acc,
            head_temp: &[],
            water_temp: &[],
            exhaust_temp: &[],
            lambda: &[],
        };
        let samples = compute_samples(&input, &[(0, 0..1)], &config, &limits, &drivetrain, 1.225);
        let drag_cv = 0.5 * 1.225 * config.kart.frontal_area_m2 * config.kart.drag_coefficient
            * v.powi(3)
            / CV_WATTS;
        let rolling_cv = config.kart.mass_kg
            * STANDARD_GRAVITY
            * (config.tyre.rolling_c1 + config.tyre.rolling_c2 * v * v)
            * v
            / CV_WATTS;
        let expected = drag_cv + rolling_cv;
        assert!((samples[0].power_cv - expected) / expected < 0.10);
    }

    #[test]
    fn test_shifter_samples_keep_gear_and_lap() {
        let config = VehicleConfig {
            engine: EngineConfig {
                inertia_kgm2: 0.003,
                primary: GearPair::new(19, 75),
                gears: vec![GearPair::new(13, 33), GearPair::new(16, 29)],
            },
            final_drive: FinalDrive {
                front_teeth: 11,
                rear_teeth: 80,
            },
            tyre: TyreConfig::default(),
            ..Default::default()
        };
        let drivetrain = Drivetrain::new(&config.engine, &config.final_drive, &config.tyre);
        let ratio2 = drivetrain.total_ratio(2).unwrap();
        let radius = config.tyre.radius_m();
        let v = 12.0;
        let rpm = vec![(v / radius) * ratio2 * 30.0 / std::f64::consts::PI];
        let speed = vec![v * 3.6];
        let acc = vec![0.3];
        let temps = vec![48.0];
        let input = EngineInput {
            rpm: &rpm,
            speed_kmh: &speed,
            lon_acc_g: &acc,
            head_temp: &temps,
            water_temp: &[],
            exhaust_temp: &[],
            lambda: &[],
        };
        let limits = EngineLimits {
            min_rpm: 1000.0,
            max_rpm: 20000.0,
            max_power_cv: 100.0,
        };
        let samples = compute_samples(&input, &[(3, 0..1)], &config, &limits, &drivetrain, 1.18);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].gear, 2);
        assert_eq!(samples[0].lap, 3);
        assert!((samples[0].head_temp - 48.0).abs() < 1e-9);
        assert!((samples[0].water_temp - 0.0).abs() < 1e-9);
    }
}
