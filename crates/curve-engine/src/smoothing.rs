//! Savitzky–Golay and moving-average smoothing
//!
//! Quadratic Savitzky–Golay kernels preserve curve peaks far better
//! than a plain moving average, which matters when the whole point of
//! the curve is where its peak sits. Array edges reuse the clamped
//! boundary sample.

use crate::binning::RpmBin;

/// Canonical quadratic coefficients, window 5, normaliser 35.
const SG5: [f64; 5] = [-3.0, 12.0, 17.0, 12.0, -3.0];
const SG5_NORM: f64 = 35.0;

/// Canonical quadratic coefficients, window 7, normaliser 21.
const SG7: [f64; 7] = [-2.0, 3.0, 6.0, 7.0, 6.0, 3.0, -2.0];
const SG7_NORM: f64 = 21.0;

/// Canonical quadratic coefficients, window 9, normaliser 231.
const SG9: [f64; 9] = [-21.0, 14.0, 39.0, 54.0, 59.0, 54.0, 39.0, 14.0, -21.0];
const SG9_NORM: f64 = 231.0;

/// Apply a Savitzky–Golay filter of window 5, 7 or 9.
///
/// Arrays shorter than 3 come back unchanged. Out-of-range window
/// indices clamp to the array edge.
pub fn savitzky_golay(values: &[f64], window: usize) -> Vec<f64> {
    match window {
        5 => convolve(values, &SG5, SG5_NORM),
        7 => convolve(values, &SG7, SG7_NORM),
        9 => convolve(values, &SG9, SG9_NORM),
        _ => values.to_vec(),
    }
}

/// Centred moving average with the same clamped boundary policy.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if values.len() < 3 || window < 2 {
        return values.to_vec();
    }
    let coefficients = vec![1.0; window];
    convolve(values, &coefficients, window as f64)
}

/// Smooth one curve according to the filter level in `[0, 100]`.
///
/// The level selects the kernel: off, SG-5, SG-7, SG-9, or SG-9
/// followed by a 5-point moving average.
pub fn smooth_curve(values: &[f64], filter_level: f64) -> Vec<f64> {
    if filter_level <= 0.0 {
        return values.to_vec();
    }
    if filter_level <= 25.0 {
        savitzky_golay(values, 5)
    } else if filter_level <= 50.0 {
        savitzky_golay(values, 7)
    } else if filter_level <= 75.0 {
        savitzky_golay(values, 9)
    } else {
        moving_average(&savitzky_golay(values, 9), 5)
    }
}

/// Smooth the power and torque columns of an rpm-binned curve in place.
///
/// The two columns are filtered independently; speeds, temperatures and
/// counts stay raw.
pub fn smooth_rpm_bins(bins: &mut [RpmBin], filter_level: f64) {
    if bins.is_empty() {
        return;
    }
    let power: Vec<f64> = bins.iter().map(|b| b.power_cv).collect();
    let torque: Vec<f64> = bins.iter().map(|b| b.torque_nm).collect();
    let power = smooth_curve(&power, filter_level);
    let torque = smooth_curve(&torque, filter_level);
    for (bin, (p, t)) in bins.iter_mut().zip(power.into_iter().zip(torque)) {
        bin.power_cv = p;
        bin.torque_nm = t;
    }
}

fn convolve(values: &[f64], coefficients: &[f64], normaliser: f64) -> Vec<f64> {
    let n = values.len();
    if n < 3 {
        return values.to_vec();
    }
    let half = (coefficients.len() / 2) as isize;
    (0..n)
        .map(|i| {
            let mut sum = 0.0;
            for (k, c) in coefficients.iter().enumerate() {
                let j = (i as isize + k as isize - half).clamp(0, n as isize - 1) as usize;
                sum += c * values[j];
            }
            sum / normaliser
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_zero_is_identity() {
        let values = vec![3.0, 9.0, 1.0, 7.0, 5.0];
        assert_eq!(smooth_curve(&values, 0.0), values);
        assert_eq!(smooth_curve(&values, -5.0), values);
    }

    #[test]
    fn test_kernels_preserve_constant_signals() {
        let values = vec![4.2; 20];
        for level in [10.0, 40.0, 60.0, 90.0] {
            let smoothed = smooth_curve(&values, level);
            for v in smoothed {
                assert!((v - 4.2).abs() < 1e-9, "level {level} shifted a constant");
            }
        }
    }

    #[test]
    fn test_quadratic_signal_is_reproduced_in_the_interior() {
        // A quadratic is in the model space of every quadratic SG
        // kernel, so interior samples must come back exact.
        let values: Vec<f64> = (0..30).map(|i| {
            let x = i as f64;
            0.3 * x * x - 2.0 * x + 7.0
        }).collect();
        for window in [5usize, 7, 9] {
            let smoothed = savitzky_golay(&values, window);
            let margin = window / 2;
            for i in margin..30 - margin {
                assert!(
                    (smoothed[i] - values[i]).abs() < 1e-9,
                    "window {window} bent the interior at {i}"
                );
            }
        }
    }

    #[test]
    fn test_smoothing_damps_a_spike() {
        let mut values = vec![10.0; 15];
        values[7] = 30.0;
        let smoothed = smooth_curve(&values, 60.0);
        assert!(smoothed[7] < 20.0);
        assert!(smoothed[7] > 10.0);
    }

    #[test]
    fn test_short_arrays_unchanged() {
        let values = vec![1.0, 2.0];
        assert_eq!(savitzky_golay(&values, 9), values);
        assert_eq!(moving_average(&values, 5), values);
        assert_eq!(smooth_curve(&values, 80.0), values);
    }

    #[test]
    fn test_level_ladder_selects_wider_kernels() {
        let mut values = vec![0.0; 21];
        values[10] = 21.0;
        let narrow = smooth_curve(&values, 20.0);
        let wide = smooth_curve(&values, 70.0);
        // A wider kernel spreads the impulse further from the centre.
        assert!(narrow[10] > wide[10]);
        assert!((narrow[3] - 0.0).abs() < 1e-9);
        assert!(wide[7].abs() > 0.0);
    }

    #[test]
    fn test_moving_average_boundary_clamps() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = moving_average(&values, 5);
        // At i = 0 the clamped window reads [1, 1, 1, 2, 3].
        assert!((smoothed[0] - 8.0 / 5.0).abs() < 1e-9);
        assert!((smoothed[2] - 3.0).abs() < 1e-9);
    }
}
