//! Raw motion samples from the acquisition driver

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One GPS fix taken alongside an accelerometer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsFix {
    /// Ground speed (m/s).
    pub speed_ms: f64,
    /// Reported horizontal accuracy (m).
    pub accuracy_m: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// One device-frame accelerometer sample, gravity included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionSample {
    /// Milliseconds since the recording started.
    pub timestamp_ms: u64,
    /// Device-frame acceleration including gravity (m/s²).
    pub accel: Vector3<f64>,
    /// GPS fix, when one arrived with this sample.
    pub gps: Option<GpsFix>,
}

impl MotionSample {
    pub fn new(timestamp_ms: u64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_ms,
            accel: Vector3::new(x, y, z),
            gps: None,
        }
    }

    pub fn with_gps(mut self, speed_ms: f64, accuracy_m: f64, latitude: f64, longitude: f64) -> Self {
        self.gps = Some(GpsFix {
            speed_ms,
            accuracy_m,
            latitude,
            longitude,
        });
        self
    }
}
