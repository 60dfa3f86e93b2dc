//! Error types for the pose tracker.

use thiserror::Error;

/// Why a calibration run produced no usable offset
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// No face or body was detected during the whole window
    #[error("no calibration samples were collected")]
    Empty,

    /// The averaged offset contains NaN or infinity
    #[error("calibration offset contains non-finite values")]
    Invalid,
}

/// Main error type for the library
#[derive(Error, Debug)]
pub enum TrackerError {
    /// A required landmark is absent from the detector output
    #[error("landmark {index} missing from detector output")]
    MissingLandmark { index: usize },

    /// A vector or ratio used for an angle is too small to be meaningful
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),

    /// Calibration failed and will be retried
    #[error("calibration failed: {0}")]
    Calibration(#[from] CalibrationError),

    /// The external landmark detector rejected a frame
    #[error("detector failure: {0}")]
    Detector(String),

    /// Configuration out of range
    #[error("configuration error: {0}")]
    Config(String),

    /// Config or frame JSON could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, TrackerError>;
