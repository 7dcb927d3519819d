//! Sensor-mode power curve
//!
//! With a calibration in hand, each GPS-timed sample yields a forward
//! acceleration; a force balance against drag and rolling resistance
//! gives wheel power, binned by vehicle speed.

use crate::calibration::Calibration;
use crate::sample::MotionSample;
use curve_engine::{bin_by_speed, smooth_curve, savitzky_golay, SpeedBin, SpeedSample};
use serde::{Deserialize, Serialize};

/// Standard gravity (m/s²).
const STANDARD_GRAVITY: f64 = 9.80665;

/// Metric horsepower in watts.
const CV_WATTS: f64 = 735.5;

/// GPS fixes slower than this carry no usable signal (m/s).
const MIN_GPS_SPEED_MS: f64 = 0.5;

/// Above this filter level the curve gets a second SG-5 pass.
const EXTRA_PASS_LEVEL: f64 = 80.0;

/// Parameters of the sensor-mode force balance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensorDynoConfig {
    /// Kart plus driver mass (kg).
    pub mass_kg: f64,
    pub frontal_area_m2: f64,
    pub drag_coefficient: f64,
    pub rolling_coefficient: f64,
    /// Smoothing level in [0, 100].
    pub filter_level: f64,
    /// Ambient air density (kg/m³), computed upstream.
    pub air_density: f64,
}

impl Default for SensorDynoConfig {
    fn default() -> Self {
        Self {
            mass_kg: 175.0,
            frontal_area_m2: 0.5,
            drag_coefficient: 0.8,
            rolling_coefficient: 0.02,
            filter_level: 50.0,
            air_density: 1.225,
        }
    }
}

impl SensorDynoConfig {
    pub fn with_mass(mass_kg: f64) -> Self {
        Self {
            mass_kg,
            ..Default::default()
        }
    }
}

/// Summary of a sensor-mode run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorStatistics {
    pub peak_power_cv: f64,
    /// Speed of the peak-power bin (km/h).
    pub peak_power_speed_kmh: f64,
    /// Fastest GPS fix seen (km/h).
    pub max_speed_kmh: f64,
    /// Strongest forward acceleration among accepted samples (g).
    pub max_accel_g: f64,
    /// Strongest deceleration among accepted samples (g, negative).
    pub max_decel_g: f64,
    pub total_samples: usize,
    /// Samples whose GPS speed exceeded the motion threshold.
    pub valid_speed_samples: usize,
}

/// Speed-binned power curve plus run statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorCurve {
    pub bins: Vec<SpeedBin>,
    pub statistics: SensorStatistics,
}

/// Compute the power-versus-speed curve for a sensor-mode run.
///
/// Degenerate input (no GPS, everything stationary) produces an empty
/// curve with zeroed statistics, not an error.
pub fn compute_speed_curve(
    samples: &[MotionSample],
    calibration: &Calibration,
    config: &SensorDynoConfig,
) -> SensorCurve {
    let mut statistics = SensorStatistics {
        total_samples: samples.len(),
        ..Default::default()
    };

    let mut accepted: Vec<SpeedSample> = Vec::new();
    for sample in samples {
        let Some(gps) = sample.gps else {
            continue;
        };
        let speed = gps.speed_ms;
        if speed > MIN_GPS_SPEED_MS {
            statistics.valid_speed_samples += 1;
        }
        if speed < MIN_GPS_SPEED_MS {
            continue;
        }
        statistics.max_speed_kmh = statistics.max_speed_kmh.max(speed * 3.6);

        let linear = sample.accel - calibration.gravity;
        let forward_accel = calibration.to_kart_frame(&linear).x;

        let drag =
            0.5 * config.air_density * config.frontal_area_m2 * config.drag_coefficient * speed * speed;
        let rolling = config.mass_kg * STANDARD_GRAVITY * config.rolling_coefficient;
        let force = config.mass_kg * forward_accel + drag + rolling;
        let power_w = force * speed;
        if power_w <= 0.0 {
            continue;
        }

        statistics.max_accel_g = statistics.max_accel_g.max(forward_accel / STANDARD_GRAVITY);
        statistics.max_decel_g = statistics.max_decel_g.min(forward_accel / STANDARD_GRAVITY);
        accepted.push(SpeedSample {
            speed_ms: speed,
            power_w,
            power_cv: power_w / CV_WATTS,
            accel_ms2: forward_accel,
        });
    }

    let mut bins = bin_by_speed(accepted.into_iter());
    smooth_speed_bins(&mut bins, config.filter_level);

    if let Some(peak) = bins
        .iter()
        .max_by(|a, b| a.power_cv.total_cmp(&b.power_cv))
    {
        statistics.peak_power_cv = peak.power_cv;
        statistics.peak_power_speed_kmh = peak.speed_kmh;
    }

    SensorCurve { bins, statistics }
}

/// The rpm-curve smoothing ladder, plus one extra SG-5 pass at very
/// high filter levels.
fn smooth_speed_bins(bins: &mut [SpeedBin], filter_level: f64) {
    if bins.is_empty() {
        return;
    }
    let mut power_cv: Vec<f64> = bins.iter().map(|b| b.power_cv).collect();
    let mut power_w: Vec<f64> = bins.iter().map(|b| b.power_w).collect();
    power_cv = smooth_curve(&power_cv, filter_level);
    power_w = smooth_curve(&power_w, filter_level);
    if filter_level > EXTRA_PASS_LEVEL {
        power_cv = savitzky_golay(&power_cv, 5);
        power_w = savitzky_golay(&power_w, 5);
    }
    for (bin, (cv, w)) in bins.iter_mut().zip(power_cv.into_iter().zip(power_w)) {
        bin.power_cv = cv;
        bin.power_w = w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibrator;

    fn identity_calibration() -> Calibration {
        let mut calibrator = Calibrator::new();
        for i in 0..150u64 {
            calibrator.push_sample(&MotionSample::new(i * 20, 0.0, 0.0, 9.81));
        }
        calibrator.finish_gravity_phase().unwrap();
        for i in 0..250u64 {
            calibrator.push_sample(&MotionSample::new(3000 + i * 20, 2.0, 0.0, 9.81));
        }
        calibrator.finish_forward_phase().unwrap()
    }

    /// 50 Hz for 10 s, accel 1 m/s² forward, speed ramping 0→30 m/s.
    fn ramp_samples() -> Vec<MotionSample> {
        (0..500u64)
            .map(|i| {
                let speed = 30.0 * i as f64 / 499.0;
                MotionSample::new(i * 20, 1.0, 0.0, 9.81).with_gps(speed, 3.0, 45.6, 9.2)
            })
            .collect()
    }

    #[test]
    fn test_ramp_produces_drag_dominated_curve() {
        let calibration = identity_calibration();
        let samples = ramp_samples();
        let curve = compute_speed_curve(&samples, &calibration, &SensorDynoConfig::with_mass(180.0));

        let in_window = curve
            .bins
            .iter()
            .filter(|b| b.speed_kmh > 15.0 && b.speed_kmh < 105.0)
            .count();
        assert!(in_window >= 5, "{in_window} bins in (15, 105) km/h");
        assert!(curve.bins.iter().all(|b| b.samples >= 3));
        assert!(curve.statistics.peak_power_cv > 0.0);

        // Drag grows with v², so the peak sits in the fastest bin.
        let fastest = curve.bins.last().unwrap();
        assert!(
            (curve.statistics.peak_power_speed_kmh - fastest.speed_kmh).abs() < 1e-9,
            "peak at {} km/h, fastest bin {} km/h",
            curve.statistics.peak_power_speed_kmh,
            fastest.speed_kmh
        );
        assert!((curve.statistics.max_speed_kmh - 108.0).abs() < 0.5);
        assert_eq!(curve.statistics.total_samples, 500);
        assert!(curve.statistics.valid_speed_samples > 480);
        assert!(curve.statistics.max_accel_g > 0.09);
    }

    #[test]
    fn test_stationary_run_is_empty_not_an_error() {
        let calibration = identity_calibration();
        let samples: Vec<MotionSample> = (0..100u64)
            .map(|i| MotionSample::new(i * 20, 0.0, 0.0, 9.81).with_gps(0.2, 3.0, 45.6, 9.2))
            .collect();
        let curve = compute_speed_curve(&samples, &calibration, &SensorDynoConfig::default());
        assert!(curve.bins.is_empty());
        assert_eq!(curve.statistics.peak_power_cv, 0.0);
        assert_eq!(curve.statistics.valid_speed_samples, 0);
        assert_eq!(curve.statistics.total_samples, 100);
    }

    #[test]
    fn test_samples_without_gps_are_skipped() {
        let calibration = identity_calibration();
        let mut samples = ramp_samples();
        for s in samples.iter_mut().take(250) {
            s.gps = None;
        }
        let curve = compute_speed_curve(&samples, &calibration, &SensorDynoConfig::default());
        assert_eq!(curve.statistics.total_samples, 500);
        assert!(curve.statistics.valid_speed_samples < 250);
    }

    #[test]
    fn test_braking_samples_with_net_negative_power_dropped() {
        let calibration = identity_calibration();
        // Hard deceleration at modest speed: drag cannot offset it.
        let samples: Vec<MotionSample> = (0..10u64)
            .map(|i| MotionSample::new(i * 20, -4.0, 0.0, 9.81).with_gps(10.0, 3.0, 45.6, 9.2))
            .collect();
        let curve = compute_speed_curve(&samples, &calibration, &SensorDynoConfig::default());
        assert!(curve.bins.is_empty());
        // Rejected samples contribute no extreme-acceleration stats.
        assert_eq!(curve.statistics.max_decel_g, 0.0);
    }

    #[test]
    fn test_mild_coasting_keeps_positive_power_samples() {
        let calibration = identity_calibration();
        // Slight deceleration at high speed: drag keeps net power
        // positive, and the sample sets the deceleration statistic.
        let samples: Vec<MotionSample> = (0..10u64)
            .map(|i| MotionSample::new(i * 20, -0.1, 0.0, 9.81).with_gps(25.0, 3.0, 45.6, 9.2))
            .collect();
        let curve = compute_speed_curve(&samples, &calibration, &SensorDynoConfig::default());
        assert_eq!(curve.bins.len(), 1);
        assert!(curve.statistics.max_decel_g < 0.0);
    }

    #[test]
    fn test_high_filter_level_extra_pass_changes_curve() {
        let calibration = identity_calibration();
        let samples = ramp_samples();
        let mid = compute_speed_curve(
            &samples,
            &calibration,
            &SensorDynoConfig {
                filter_level: 78.0,
                ..SensorDynoConfig::default()
            },
        );
        let high = compute_speed_curve(
            &samples,
            &calibration,
            &SensorDynoConfig {
                filter_level: 95.0,
                ..SensorDynoConfig::default()
            },
        );
        assert_eq!(mid.bins.len(), high.bins.len());
        let differs = mid
            .bins
            .iter()
            .zip(&high.bins)
            .any(|(a, b)| (a.power_cv - b.power_cv).abs() > 1e-12);
        assert!(differs, "extra SG-5 pass had no effect");
    }
}
