// src/error.rs
//! Unified error handling for the screening core
//!
//! Two layers live here. [`ScreeningError`] is the boundary error for the few
//! operations that can be handed structurally invalid input (a frame buffer whose
//! byte length does not match its dimensions, an unknown Snellen rating string, a
//! corrupt calibration profile). [`SignalFault`] is never returned as an `Err`: the
//! extractors and scorers recover locally and attach the fault to their sentinel
//! result so the caller can tell why a value came back as zero.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boundary errors for the screening core
#[derive(Debug, Error)]
pub enum ScreeningError {
    /// Frame buffer length does not match `width * height * 4`
    #[error("invalid frame buffer: expected {expected} bytes, got {actual}")]
    InvalidFrame {
        /// Byte count implied by the frame dimensions
        expected: usize,
        /// Byte count actually supplied
        actual: usize,
    },

    /// Snellen notation not present in the chart table
    #[error("unknown Snellen rating: {0}")]
    UnknownSnellenRating(String),

    /// Age band label not recognised
    #[error("unknown age group: {0}")]
    UnknownAgeGroup(String),

    /// Frequency outside the audiometric set {250, 500, 1000, 2000, 4000, 8000} Hz
    #[error("unsupported audiometric frequency: {0} Hz")]
    InvalidFrequency(u32),

    /// Calibration profile could not be encoded or decoded
    #[error("calibration profile format error: {0}")]
    ProfileFormat(#[from] serde_json::Error),

    /// Calibration wizard driven out of order
    #[error("calibration error: {0}")]
    Calibration(String),
}

/// Result type alias for screening operations
pub type ScreeningResult<T> = Result<T, ScreeningError>;

/// Locally recovered failure attached to a sentinel measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SignalFault {
    /// Fewer samples (or intervals, or peaks) than the extractor needs
    InsufficientData {
        /// Minimum count required
        required: usize,
        /// Count actually available
        actual: usize,
    },
    /// Calibration missing or expired
    InvalidCalibration,
    /// Computed value fell outside the physiologically plausible band
    OutOfRange,
    /// Zero variance or zero range input
    DegenerateInput,
}

impl SignalFault {
    /// Shorthand for an insufficient-data fault
    pub fn insufficient(required: usize, actual: usize) -> Self {
        SignalFault::InsufficientData { required, actual }
    }
}

impl std::fmt::Display for SignalFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalFault::InsufficientData { required, actual } => {
                write!(f, "insufficient data: need {}, have {}", required, actual)
            }
            SignalFault::InvalidCalibration => write!(f, "missing or expired calibration"),
            SignalFault::OutOfRange => write!(f, "value outside plausible range"),
            SignalFault::DegenerateInput => write!(f, "degenerate input"),
        }
    }
}
