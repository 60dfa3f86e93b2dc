//! Shared tracker constants used by both build.rs and runtime code.
//!
//! This module is included by both the build script and the config module
//! so preset validation at compile time and `TrackerConfig::validate` agree.

// Some constants are only used by build.rs for validation
#![allow(dead_code)]

/// Length of the calibration window in milliseconds
pub const DEFAULT_CALIBRATION_DURATION_MS: f64 = 3000.0;
/// Minimum spacing between two recorded calibration samples
pub const DEFAULT_SAMPLE_INTERVAL_MS: f64 = 100.0;
/// Delay between the first camera frame and the automatic calibration start
pub const DEFAULT_AUTO_START_DELAY_MS: f64 = 1000.0;
/// Delay before a failed calibration is started again
pub const DEFAULT_RETRY_DELAY_MS: f64 = 1000.0;
/// Time after which an unresolved detector call is abandoned
pub const DEFAULT_DETECTION_TIMEOUT_MS: f64 = 2000.0;
/// How long "Calibration complete!" stays in the status message
pub const DEFAULT_COMPLETION_NOTICE_MS: f64 = 2000.0;

/// Capture size the detector runs at; head formulas work in pixels
pub const DEFAULT_FRAME_WIDTH: f32 = 1280.0;
pub const DEFAULT_FRAME_HEIGHT: f32 = 720.0;

/// Pixel offset between eye midpoint and nose that maps to one unit of pitch
pub const DEFAULT_PITCH_DIVISOR: f32 = 50.0;
/// Yaw saturation bound (radians)
pub const DEFAULT_YAW_LIMIT: f32 = 1.2;
/// Nose-to-eye distance (pixels) below which the yaw ratio is treated as degenerate
pub const DEFAULT_YAW_EPSILON: f32 = 1e-3;

/// Minimum segment length (normalized units) for body angle estimation
pub const MIN_SEGMENT_LENGTH: f32 = 1e-3;

/// Facial fallbacks when the detector provides no blendshapes
pub const MOUTH_OPEN_THRESHOLD: f32 = 0.02;
pub const MOUTH_OPEN_GAIN: f32 = 15.0;
pub const JAW_OPEN_MAX: f32 = 1.2;
pub const JAW_BLENDSHAPE_GAIN: f32 = 1.2;
pub const EYE_OPEN_THRESHOLD: f32 = 0.004;
pub const BLINK_SCORE_THRESHOLD: f32 = 0.5;

/// Accepted range for every per-axis sensitivity multiplier.
/// Observed tunings sit between 0.5 and 2.0; the bounds leave headroom.
pub const MIN_SENSITIVITY: f32 = 0.1;
pub const MAX_SENSITIVITY: f32 = 10.0;

/// Range checks shared by build-time preset validation and runtime config validation.
pub struct Limits;

impl Limits {
    /// Check a duration-like value (must be finite and > 0)
    pub fn check_positive_ms(name: &str, value: f64) -> Result<(), String> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(format!("{} must be a positive number of milliseconds, got {}", name, value))
        }
    }

    /// Check a delay value (finite and >= 0)
    pub fn check_delay_ms(name: &str, value: f64) -> Result<(), String> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(format!("{} must be >= 0 ms, got {}", name, value))
        }
    }

    /// Check a sensitivity multiplier against [MIN_SENSITIVITY, MAX_SENSITIVITY]
    pub fn check_sensitivity(name: &str, value: f32) -> Result<(), String> {
        if (MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&value) {
            Ok(())
        } else {
            Err(format!(
                "{} sensitivity {} outside [{}, {}]",
                name, value, MIN_SENSITIVITY, MAX_SENSITIVITY
            ))
        }
    }
}
