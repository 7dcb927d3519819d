//! Fixed-width binning
//!
//! Engine-speed bins are 100 rpm wide and reported at their centre
//! (base + 50). Vehicle-speed bins are 5 km/h wide. Temperature and
//! lambda means skip the zero sentinel a missing channel produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Width of an engine-speed bin (rpm).
pub const RPM_BIN_WIDTH: f64 = 100.0;

/// Width of a vehicle-speed bin (km/h).
pub const SPEED_BIN_WIDTH_KMH: f64 = 5.0;

/// Speed bins thinner than this are too noisy to report.
pub const MIN_SPEED_BIN_SAMPLES: usize = 3;

/// Input to the rpm binner, one accepted sample.
#[derive(Debug, Clone, Copy)]
pub struct RpmSample {
    pub rpm: f64,
    pub speed_kmh: f64,
    pub power_cv: f64,
    pub torque_nm: f64,
    pub head_temp: f64,
    pub water_temp: f64,
    pub exhaust_temp: f64,
    pub lambda: f64,
}

/// Mean wheel output over one 100 rpm interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpmBin {
    /// Bin centre (base + 50 rpm).
    pub rpm: f64,
    pub speed_kmh: f64,
    pub power_cv: f64,
    pub torque_nm: f64,
    pub head_temp: f64,
    pub water_temp: f64,
    pub exhaust_temp: f64,
    pub lambda: f64,
    pub samples: usize,
}

#[derive(Debug, Default, Clone)]
struct RpmAccumulator {
    speed: f64,
    power: f64,
    torque: f64,
    count: usize,
    head: SentinelMean,
    water: SentinelMean,
    exhaust: SentinelMean,
    lambda: SentinelMean,
}

/// Mean that ignores the `<= 0` sentinel of absent channels.
#[derive(Debug, Default, Clone, Copy)]
struct SentinelMean {
    sum: f64,
    count: usize,
}

impl SentinelMean {
    fn push(&mut self, value: f64) {
        if value > 0.0 {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Group accepted samples into 100 rpm bins.
///
/// Bins with no samples or a non-positive mean power are dropped; the
/// result is sorted by bin centre.
pub fn bin_by_rpm(samples: impl Iterator<Item = RpmSample>) -> Vec<RpmBin> {
    let mut bins: BTreeMap<i64, RpmAccumulator> = BTreeMap::new();
    for sample in samples {
        if !sample.rpm.is_finite() || sample.rpm < 0.0 {
            continue;
        }
        let base = (sample.rpm / RPM_BIN_WIDTH).floor() * RPM_BIN_WIDTH;
        let accumulator = bins.entry(base as i64).or_default();
        accumulator.speed += sample.speed_kmh;
        accumulator.power += sample.power_cv;
        accumulator.torque += sample.torque_nm;
        accumulator.count += 1;
        accumulator.head.push(sample.head_temp);
        accumulator.water.push(sample.water_temp);
        accumulator.exhaust.push(sample.exhaust_temp);
        accumulator.lambda.push(sample.lambda);
    }

    bins.into_iter()
        .filter(|(_, acc)| acc.count > 0)
        .filter_map(|(base, acc)| {
            let n = acc.count as f64;
            let power = acc.power / n;
            if power <= 0.0 {
                return None;
            }
            Some(RpmBin {
                rpm: base as f64 + RPM_BIN_WIDTH / 2.0,
                speed_kmh: acc.speed / n,
                power_cv: power,
                torque_nm: acc.torque / n,
                head_temp: acc.head.mean(),
                water_temp: acc.water.mean(),
                exhaust_temp: acc.exhaust.mean(),
                lambda: acc.lambda.mean(),
                samples: acc.count,
            })
        })
        .collect()
}

/// Input to the speed binner, one accepted sensor sample.
#[derive(Debug, Clone, Copy)]
pub struct SpeedSample {
    pub speed_ms: f64,
    pub power_w: f64,
    pub power_cv: f64,
    pub accel_ms2: f64,
}

/// Mean power over one 5 km/h interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedBin {
    /// Bin centre (km/h).
    pub speed_kmh: f64,
    /// Bin centre (m/s).
    pub speed_ms: f64,
    pub power_cv: f64,
    pub power_w: f64,
    pub accel_ms2: f64,
    pub samples: usize,
}

#[derive(Debug, Default, Clone)]
struct SpeedAccumulator {
    power_w: f64,
    power_cv: f64,
    accel: f64,
    count: usize,
}

/// Group accepted sensor samples into 5 km/h bins.
///
/// Bins with fewer than [`MIN_SPEED_BIN_SAMPLES`] samples are dropped.
pub fn bin_by_speed(samples: impl Iterator<Item = SpeedSample>) -> Vec<SpeedBin> {
    let mut bins: BTreeMap<i64, SpeedAccumulator> = BTreeMap::new();
    for sample in samples {
        let speed_kmh = sample.speed_ms * 3.6;
        if !speed_kmh.is_finite() || speed_kmh < 0.0 {
            continue;
        }
        let slot = (speed_kmh / SPEED_BIN_WIDTH_KMH).floor() as i64;
        let accumulator = bins.entry(slot).or_default();
        accumulator.power_w += sample.power_w;
        accumulator.power_cv += sample.power_cv;
        accumulator.accel += sample.accel_ms2;
        accumulator.count += 1;
    }

    bins.into_iter()
        .filter(|(_, acc)| acc.count >= MIN_SPEED_BIN_SAMPLES)
        .map(|(slot, acc)| {
            let n = acc.count as f64;
            let centre_kmh = (slot as f64 + 0.5) * SPEED_BIN_WIDTH_KMH;
            SpeedBin {
                speed_kmh: centre_kmh,
                speed_ms: centre_kmh / 3.6,
                power_cv: acc.power_cv / n,
                power_w: acc.power_w / n,
                accel_ms2: acc.accel / n,
                samples: acc.count,
            }
        })
        .collect()
}
