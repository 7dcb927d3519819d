//! Pipeline orchestration

use crate::document::{AnalysisDocument, ConfigSummary, LapSummary, LapTrace, SensorDocument};
use crate::error::AnalysisError;
use chrono::Utc;
use curve_engine::{bin_by_rpm, curve_statistics, smooth_rpm_bins, RpmSample};
use log_decoder::{decode, extract_laps, materialize, Channel, ChannelMap, Lap, Telemetry};
use motion_calib::{compute_speed_curve, Calibration, MotionSample, SensorDynoConfig};
use power_model::{
    compute_samples, Drivetrain, EngineInput, EngineLimits, RunConditions, VehicleConfig, CV_WATTS,
    STANDARD_GRAVITY,
};
use std::ops::Range;
use uuid::Uuid;

/// Lap-power traces only make sense once the kart actually moves (m/s).
const TRACE_MIN_SPEED_MS: f64 = 1.0;

/// Per-run analysis parameters.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Lap indices to analyse; empty means every lap.
    pub selected_laps: Vec<usize>,
    pub limits: EngineLimits,
    /// Curve smoothing level in [0, 100].
    pub filter_level: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            selected_laps: Vec::new(),
            limits: EngineLimits::default(),
            filter_level: 50.0,
        }
    }
}

/// Analyse raw logger CSV bytes end to end.
///
/// Decodes the file, resolves channels automatically, extracts laps and
/// runs the physics pipeline.
pub fn analyze_csv(
    bytes: &[u8],
    config: &VehicleConfig,
    settings: &AnalysisSettings,
) -> Result<AnalysisDocument, AnalysisError> {
    let log = decode(bytes)?;
    let map = ChannelMap::resolve(&log.headers);
    if let Some(missing) = map.missing_required().first() {
        return Err(AnalysisError::MissingChannel(missing.name()));
    }
    let telemetry = materialize(&log, &map);
    let lap_channel = map
        .is_matched(Channel::Lap)
        .then(|| telemetry.channel(Channel::Lap));
    let laps = extract_laps(lap_channel, &log.metadata, &telemetry.time);
    analyze_telemetry(&telemetry, &laps, config, settings)
}

/// Analyse already-materialised telemetry.
///
/// Degenerate sessions (nothing accepted, no gear ever detected) come
/// back as an empty curve with zeroed statistics, not an error.
pub fn analyze_telemetry(
    telemetry: &Telemetry,
    laps: &[Lap],
    config: &VehicleConfig,
    settings: &AnalysisSettings,
) -> Result<AnalysisDocument, AnalysisError> {
    config.validate()?;
    settings.limits.validate()?;
    if !(0.0..=100.0).contains(&settings.filter_level) {
        return Err(power_model::ConfigError::OutOfRange {
            field: "filterLevel",
            value: settings.filter_level,
            min: 0.0,
            max: 100.0,
        }
        .into());
    }

    // One density for the whole call.
    let air_density = config.conditions.air_density();
    let drivetrain = Drivetrain::new(&config.engine, &config.final_drive, &config.tyre);

    let selections = select_ranges(laps, &settings.selected_laps);
    let input = EngineInput {
        rpm: &telemetry.rpm,
        speed_kmh: &telemetry.speed_kmh,
        lon_acc_g: &telemetry.lon_acc_g,
        head_temp: &telemetry.head_temp,
        water_temp: &telemetry.water_temp,
        exhaust_temp: &telemetry.exhaust_temp,
        lambda: &telemetry.lambda,
    };
    let accepted = compute_samples(
        &input,
        &selections,
        config,
        &settings.limits,
        &drivetrain,
        air_density,
    );
    let accepted_count = accepted.len();

    let mut bins = bin_by_rpm(accepted.iter().map(|s| RpmSample {
        rpm: s.rpm,
        speed_kmh: s.speed_kmh,
        power_cv: s.power_cv,
        torque_nm: s.torque_nm,
        head_temp: s.head_temp,
        water_temp: s.water_temp,
        exhaust_temp: s.exhaust_temp,
        lambda: s.lambda,
    }));
    smooth_rpm_bins(&mut bins, settings.filter_level);
    let statistics = curve_statistics(&bins);

    let traces = lap_traces(telemetry, laps, config, &drivetrain, &settings.selected_laps);

    Ok(AnalysisDocument {
        id: Uuid::new_v4(),
        generated_at: Utc::now(),
        bins,
        accepted_samples: accepted_count,
        statistics,
        lap_summary: lap_summary(laps),
        laps: traces,
        configuration: ConfigSummary {
            mass_kg: config.kart.mass_kg,
            gear_count: config.engine.gears.len(),
            direct_drive: config.engine.is_direct_drive(),
            final_drive_ratio: config.final_drive.ratio(),
            tyre_diameter_mm: config.tyre.diameter_mm,
            air_density,
            track_grip: config.conditions.grip,
            min_rpm: settings.limits.min_rpm,
            max_rpm: settings.limits.max_rpm,
            max_power_cv: settings.limits.max_power_cv,
            filter_level: settings.filter_level,
        },
    })
}

/// Analyse a sensor-mode run: calibration first, then the speed curve.
pub fn analyze_sensor(
    samples: &[MotionSample],
    calibration: &Calibration,
    mass_kg: f64,
    conditions: &RunConditions,
    filter_level: f64,
) -> SensorDocument {
    let dyno = SensorDynoConfig {
        mass_kg,
        filter_level,
        air_density: conditions.air_density(),
        ..Default::default()
    };
    let curve = compute_speed_curve(samples, calibration, &dyno);
    SensorDocument {
        id: Uuid::new_v4(),
        generated_at: Utc::now(),
        curve: curve.bins,
        statistics: curve.statistics,
        calibration_quality: calibration.quality,
    }
}

/// Resolve the lap selection into `(lap, range)` pairs; an empty
/// selection means the whole session.
fn select_ranges(laps: &[Lap], selected: &[usize]) -> Vec<(usize, Range<usize>)> {
    laps.iter()
        .enumerate()
        .filter(|(i, _)| selected.is_empty() || selected.contains(i))
        .map(|(i, lap)| (i, lap.start..lap.end))
        .collect()
}

fn lap_traces(
    telemetry: &Telemetry,
    laps: &[Lap],
    config: &VehicleConfig,
    drivetrain: &Drivetrain,
    selected: &[usize],
) -> Vec<LapTrace> {
    let mass = config.kart.mass_kg;
    laps.iter()
        .enumerate()
        .map(|(index, lap)| {
            let range = lap.start..lap.end.min(telemetry.len());
            let lap_start_time = telemetry.time.get(lap.start).copied().unwrap_or(0.0);

            let mut trace = LapTrace {
                lap: index,
                lap_time_s: lap.time_s,
                is_out_lap: lap.is_out_lap,
                is_in_lap: lap.is_in_lap,
                selected: selected.is_empty() || selected.contains(&index),
                ..Default::default()
            };
            for i in range {
                let speed_kmh = channel_value(&telemetry.speed_kmh, i);
                let rpm = channel_value(&telemetry.rpm, i);
                let speed_ms = speed_kmh / 3.6;
                let accel = channel_value(&telemetry.lon_acc_g, i) * STANDARD_GRAVITY;
                let gear = drivetrain.detect_gear(rpm, speed_ms);
                // Coarse inertial estimate: enough for a lap overlay,
                // not for the curve.
                let power_cv = if speed_ms > TRACE_MIN_SPEED_MS && gear > 0 && accel > 0.0 {
                    mass * accel * speed_ms / CV_WATTS
                } else {
                    0.0
                };
                trace.time_s.push(channel_value(&telemetry.time, i) - lap_start_time);
                trace.speed_kmh.push(speed_kmh);
                trace.rpm.push(rpm);
                trace.gear.push(gear);
                trace.power_cv.push(power_cv);
            }
            trace
        })
        .collect()
}

fn channel_value(channel: &[f64], i: usize) -> f64 {
    channel.get(i).copied().unwrap_or(0.0)
}

/// Best and mean lap time over the timed laps.
fn lap_summary(laps: &[Lap]) -> LapSummary {
    let timed: Vec<&Lap> = laps
        .iter()
        .filter(|l| !l.is_out_lap && !l.is_in_lap)
        .collect();
    let mut summary = LapSummary {
        lap_count: laps.len(),
        timed_lap_count: timed.len(),
        ..Default::default()
    };
    if timed.is_empty() {
        return summary;
    }
    summary.best_lap_s = timed
        .iter()
        .map(|l| l.time_s)
        .fold(f64::INFINITY, f64::min);
    summary.mean_lap_s = timed.iter().map(|l| l.time_s).sum::<f64>() / timed.len() as f64;
    summary
}
