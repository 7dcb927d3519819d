//! Pipeline error surface
//!
//! Component errors pass through unchanged; the wrapper names the
//! component that raised them so a caller sees one error with context.

use log_decoder::DecodeError;
use motion_calib::CalibrationError;
use power_model::ConfigError;
use thiserror::Error;

/// Coarse error classes the external surface exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    ConfigurationInvalid,
    InsufficientSamples,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed-input",
            ErrorKind::ConfigurationInvalid => "configuration-invalid",
            ErrorKind::InsufficientSamples => "insufficient-samples",
        }
    }
}

/// Any failure the analysis pipeline can surface.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("csv decoder: {0}")]
    Decode(#[from] DecodeError),

    /// A required channel had no matching column header.
    #[error("channel resolver: required channel '{0}' is unmatched")]
    MissingChannel(&'static str),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("calibration engine: {0}")]
    Calibration(#[from] CalibrationError),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Decode(_) | AnalysisError::MissingChannel(_) => {
                ErrorKind::MalformedInput
            }
            AnalysisError::Config(_) => ErrorKind::ConfigurationInvalid,
            AnalysisError::Calibration(_) => ErrorKind::InsufficientSamples,
        }
    }
}
