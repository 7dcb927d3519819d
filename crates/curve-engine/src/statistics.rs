//! Curve summary statistics

use crate::binning::RpmBin;
use serde::{Deserialize, Serialize};

/// Summary of an rpm-binned power/torque curve.
///
/// A degenerate run (no bins) yields all-zero statistics rather than an
/// error; callers decide what an empty curve means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveStatistics {
    pub peak_power_cv: f64,
    pub peak_power_rpm: f64,
    pub peak_torque_nm: f64,
    pub peak_torque_rpm: f64,
    pub mean_power_cv: f64,
    pub mean_torque_nm: f64,
    pub rpm_min: f64,
    pub rpm_max: f64,
    /// Total accepted samples behind the curve.
    pub sample_count: usize,
}

/// Summarise a sorted rpm-binned curve.
pub fn curve_statistics(bins: &[RpmBin]) -> CurveStatistics {
    if bins.is_empty() {
        return CurveStatistics::default();
    }

    let mut stats = CurveStatistics {
        rpm_min: bins[0].rpm,
        rpm_max: bins[bins.len() - 1].rpm,
        ..Default::default()
    };

    let mut power_sum = 0.0;
    let mut torque_sum = 0.0;
    for bin in bins {
        if bin.power_cv > stats.peak_power_cv {
            stats.peak_power_cv = bin.power_cv;
            stats.peak_power_rpm = bin.rpm;
        }
        if bin.torque_nm > stats.peak_torque_nm {
            stats.peak_torque_nm = bin.torque_nm;
            stats.peak_torque_rpm = bin.rpm;
        }
        power_sum += bin.power_cv;
        torque_sum += bin.torque_nm;
        stats.sample_count += bin.samples;
    }
    let n = bins.len() as f64;
    stats.mean_power_cv = power_sum / n;
    stats.mean_torque_nm = torque_sum / n;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(rpm: f64, power: f64, torque: f64, samples: usize) -> RpmBin {
        RpmBin {
            rpm,
            speed_kmh: 60.0,
            power_cv: power,
            torque_nm: torque,
            head_temp: 0.0,
            water_temp: 0.0,
            exhaust_temp: 0.0,
            lambda: 0.0,
            samples,
        }
    }

    #[test]
    fn test_peaks_and_means() {
        let bins = vec![
            bin(8_050.0, 10.0, 9.0, 4),
            bin(9_050.0, 22.0, 17.5, 6),
            bin(10_050.0, 18.0, 12.0, 5),
        ];
        let stats = curve_statistics(&bins);
        assert!((stats.peak_power_cv - 22.0).abs() < 1e-9);
        assert!((stats.peak_power_rpm - 9_050.0).abs() < 1e-9);
        assert!((stats.peak_torque_nm - 17.5).abs() < 1e-9);
        assert!((stats.peak_torque_rpm - 9_050.0).abs() < 1e-9);
        assert!((stats.mean_power_cv - 50.0 / 3.0).abs() < 1e-9);
        assert!((stats.rpm_min - 8_050.0).abs() < 1e-9);
        assert!((stats.rpm_max - 10_050.0).abs() < 1e-9);
        assert_eq!(stats.sample_count, 15);
    }

    #[test]
    fn test_empty_curve_is_zeroed() {
        let stats = curve_statistics(&[]);
        assert_eq!(stats, CurveStatistics::default());
    }
}
