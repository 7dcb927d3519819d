//! Calibration error types

use thiserror::Error;

/// Errors from the calibration state machine.
#[derive(Debug, Clone, Error)]
pub enum CalibrationError {
    /// A calibration window was closed before its minimum fill.
    #[error("{phase} phase needs {needed} samples, got {got}")]
    InsufficientSamples {
        phase: &'static str,
        got: usize,
        needed: usize,
    },

    /// A window boundary arrived in the wrong phase.
    #[error("calibration is not in the {expected} phase")]
    WrongPhase { expected: &'static str },
}
