//! Device→kart mounting calibration
//!
//! The phone can sit in any orientation, so two guided windows recover
//! the rotation: a stationary window gives the gravity direction, a
//! hard straight-line acceleration gives the forward axis. At rest the
//! accelerometer reads the support force, so the gravity-window mean
//! points up in the device frame.

use crate::error::CalibrationError;
use crate::sample::MotionSample;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Minimum stationary samples (~3 s at 50 Hz).
pub const GRAVITY_PHASE_MIN_SAMPLES: usize = 150;

/// Minimum driving samples (~5 s at 50 Hz).
pub const FORWARD_PHASE_MIN_SAMPLES: usize = 250;

/// Reference gravity magnitude for the quality score (m/s²).
const REFERENCE_GRAVITY: f64 = 9.81;

/// Gravity means farther off than this trigger a warning.
const GRAVITY_MAGNITUDE_TOLERANCE: f64 = 1.5;

/// Gravity-removed samples below this magnitude are idle noise.
const MOTION_THRESHOLD_MS2: f64 = 0.5;

/// Fall back to the full buffer when fewer moving samples survive.
const MIN_PCA_SAMPLES: usize = 20;

const POWER_ITERATIONS: usize = 50;

/// Calibration state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalibrationPhase {
    AwaitingGravity,
    AwaitingForward,
    Done,
    Failed,
}

/// A completed device→kart calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    /// Mean stationary reading in the device frame (m/s²). Subtract it
    /// from raw samples to get linear acceleration.
    pub gravity: Vector3<f64>,
    /// Kart axes as unit vectors in the device frame.
    pub forward: Vector3<f64>,
    pub right: Vector3<f64>,
    pub up: Vector3<f64>,
    /// Rows are (forward, right, up): `a_kart = rotation * a_device`.
    pub rotation: Matrix3<f64>,
    /// Mean of the gravity, signal-strength and orthogonality
    /// subscores, each in [0, 1].
    pub quality: f64,
    /// Set when the stationary mean was far from 9.81 m/s².
    pub gravity_magnitude_warning: bool,
    /// Timestamp of the last sample that entered the calibration (ms).
    pub completed_at_ms: u64,
}

impl Calibration {
    /// Rotate a gravity-removed device-frame acceleration into kart
    /// coordinates (forward, right, up).
    pub fn to_kart_frame(&self, linear_accel: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * linear_accel
    }

    /// Gravity-removed forward acceleration for a raw sample.
    pub fn forward_acceleration(&self, accel: &Vector3<f64>) -> f64 {
        self.forward.dot(&(accel - self.gravity))
    }
}

/// Two-window calibration state machine.
///
/// The caller owns window boundaries: it pushes samples one at a time
/// and calls [`Calibrator::finish_gravity_phase`] /
/// [`Calibrator::finish_forward_phase`] when the user completes each
/// step. Concurrent pushes are the caller's problem; the machine is a
/// plain sequential value.
#[derive(Debug, Clone)]
pub struct Calibrator {
    phase: CalibrationPhase,
    gravity_samples: Vec<Vector3<f64>>,
    forward_samples: Vec<Vector3<f64>>,
    last_timestamp_ms: u64,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibrator {
    pub fn new() -> Self {
        Self {
            phase: CalibrationPhase::AwaitingGravity,
            gravity_samples: Vec::with_capacity(GRAVITY_PHASE_MIN_SAMPLES),
            forward_samples: Vec::with_capacity(FORWARD_PHASE_MIN_SAMPLES),
            last_timestamp_ms: 0,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Fill fraction across both windows, in [0, 1].
    pub fn progress(&self) -> f64 {
        let gravity = self.gravity_samples.len().min(GRAVITY_PHASE_MIN_SAMPLES);
        let forward = self.forward_samples.len().min(FORWARD_PHASE_MIN_SAMPLES);
        (gravity + forward) as f64 / (GRAVITY_PHASE_MIN_SAMPLES + FORWARD_PHASE_MIN_SAMPLES) as f64
    }

    /// Feed one sample; returns the phase and overall progress.
    ///
    /// Samples pushed after completion or failure are ignored.
    pub fn push_sample(&mut self, sample: &MotionSample) -> (CalibrationPhase, f64) {
        match self.phase {
            CalibrationPhase::AwaitingGravity => {
                self.gravity_samples.push(sample.accel);
                self.last_timestamp_ms = sample.timestamp_ms;
            }
            CalibrationPhase::AwaitingForward => {
                self.forward_samples.push(sample.accel);
                self.last_timestamp_ms = sample.timestamp_ms;
            }
            CalibrationPhase::Done | CalibrationPhase::Failed => {}
        }
        (self.phase, self.progress())
    }

    /// Close the stationary window and move to the forward window.
    pub fn finish_gravity_phase(&mut self) -> Result<(), CalibrationError> {
        if self.phase != CalibrationPhase::AwaitingGravity {
            return Err(CalibrationError::WrongPhase {
                expected: "awaiting-gravity",
            });
        }
        if self.gravity_samples.len() < GRAVITY_PHASE_MIN_SAMPLES {
            self.phase = CalibrationPhase::Failed;
            return Err(CalibrationError::InsufficientSamples {
                phase: "gravity",
                got: self.gravity_samples.len(),
                needed: GRAVITY_PHASE_MIN_SAMPLES,
            });
        }
        self.phase = CalibrationPhase::AwaitingForward;
        Ok(())
    }

    /// Close the driving window and compute the calibration.
    pub fn finish_forward_phase(&mut self) -> Result<Calibration, CalibrationError> {
        if self.phase != CalibrationPhase::AwaitingForward {
            return Err(CalibrationError::WrongPhase {
                expected: "awaiting-forward",
            });
        }
        if self.forward_samples.len() < FORWARD_PHASE_MIN_SAMPLES {
            self.phase = CalibrationPhase::Failed;
            return Err(CalibrationError::InsufficientSamples {
                phase: "forward",
                got: self.forward_samples.len(),
                needed: FORWARD_PHASE_MIN_SAMPLES,
            });
        }
        let calibration = self.compute();
        self.phase = CalibrationPhase::Done;
        Ok(calibration)
    }

    /// Discard both windows and restart from the gravity phase.
    pub fn reset(&mut self) {
        self.phase = CalibrationPhase::AwaitingGravity;
        self.gravity_samples.clear();
        self.forward_samples.clear();
        self.last_timestamp_ms = 0;
    }

    fn compute(&self) -> Calibration {
        let gravity = mean(&self.gravity_samples);
        let gravity_norm = gravity.norm();
        let gravity_magnitude_warning =
            (gravity_norm - REFERENCE_GRAVITY).abs() > GRAVITY_MAGNITUDE_TOLERANCE;

        // The stationary mean is the support force, i.e. device-frame up.
        let up = if gravity_norm > 1e-9 {
            gravity / gravity_norm
        } else {
            Vector3::z()
        };

        let linear: Vec<Vector3<f64>> =
            self.forward_samples.iter().map(|a| a - gravity).collect();
        let moving: Vec<Vector3<f64>> = linear
            .iter()
            .copied()
            .filter(|a| a.norm() > MOTION_THRESHOLD_MS2)
            .collect();
        let pca_input: &[Vector3<f64>] = if moving.len() >= MIN_PCA_SAMPLES {
            &moving
        } else {
            &linear
        };

        let mut forward_raw = principal_axis(pca_input);
        if mean(&linear).dot(&forward_raw) < 0.0 {
            forward_raw = -forward_raw;
        }

        let raw_norm = forward_raw.norm();
        let forward_direction = if raw_norm > 1e-9 {
            forward_raw / raw_norm
        } else {
            fallback_forward(&up)
        };

        // Orthogonality of the detected axis, before it is forced
        // perpendicular below. Uses the eigenvalue-scaled vector, so a
        // strong but tilted signal is penalised harder.
        let alignment = forward_raw.dot(&up).abs();

        let mut forward = forward_direction - up * forward_direction.dot(&up);
        if forward.norm() > 1e-9 {
            forward.normalize_mut();
        } else {
            forward = fallback_forward(&up);
        }
        let right = forward.cross(&up);

        let rotation = Matrix3::new(
            forward.x, forward.y, forward.z, //
            right.x, right.y, right.z, //
            up.x, up.y, up.z,
        );

        let q_gravity =
            (1.0 - ((gravity_norm - REFERENCE_GRAVITY).abs() / 2.0).min(1.0)).clamp(0.0, 1.0);
        let q_signal = (raw_norm / 2.0).min(1.0);
        let q_orthogonal = (1.0 - alignment).clamp(0.0, 1.0);
        let quality = (q_gravity + q_signal + q_orthogonal) / 3.0;

        Calibration {
            gravity,
            forward,
            right,
            up,
            rotation,
            quality,
            gravity_magnitude_warning,
            completed_at_ms: self.last_timestamp_ms,
        }
    }
}

fn mean(samples: &[Vector3<f64>]) -> Vector3<f64> {
    if samples.is_empty() {
        return Vector3::zeros();
    }
    let mut sum = Vector3::zeros();
    for s in samples {
        sum += s;
    }
    sum / samples.len() as f64
}

/// Dominant axis of the acceleration energy.
///
/// Second-moment matrix about the origin (the samples are already
/// gravity-removed), then 50 power iterations with per-step
/// renormalisation. The returned vector is scaled by the dominant
/// eigenvalue so its magnitude measures signal strength.
fn principal_axis(samples: &[Vector3<f64>]) -> Vector3<f64> {
    if samples.is_empty() {
        return Vector3::zeros();
    }
    let mut moment = Matrix3::zeros();
    for s in samples {
        moment += s * s.transpose();
    }
    moment /= samples.len() as f64;

    let mut v = Vector3::new(1.0, 1.0, 1.0) / 3.0_f64.sqrt();
    for _ in 0..POWER_ITERATIONS {
        let next = moment * v;
        let norm = next.norm();
        if norm <= 1e-12 {
            return Vector3::zeros();
        }
        v = next / norm;
    }
    moment * v
}

/// An arbitrary horizontal axis for degenerate forward windows.
fn fallback_forward(up: &Vector3<f64>) -> Vector3<f64> {
    let seed = if up.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let mut forward = seed - up * seed.dot(up);
    forward.normalize_mut();
    forward
}
