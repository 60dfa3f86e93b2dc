//! Tracker configuration
//!
//! Every tunable of the estimator and calibration session lives here with
//! its default. Configs are authored as JSON (presets, or a plain object passed
//! from JavaScript); missing fields fall back to the defaults.

use crate::error::{Result, TrackerError};
use crate::rig::RigMapping;
use crate::tracker_constants::*;
use serde::{Deserialize, Serialize};

/// Per-axis multipliers applied to a joint estimate
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AxisSensitivity {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Default for AxisSensitivity {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            yaw: 1.0,
            roll: 1.0,
        }
    }
}

impl AxisSensitivity {
    fn validate(&self, joint: &str) -> std::result::Result<(), String> {
        Limits::check_sensitivity(&format!("{}.pitch", joint), self.pitch)?;
        Limits::check_sensitivity(&format!("{}.yaw", joint), self.yaw)?;
        Limits::check_sensitivity(&format!("{}.roll", joint), self.roll)
    }
}

/// Calibration window timing
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Length of the sampling window
    pub duration_ms: f64,
    /// Minimum spacing between recorded samples
    pub sample_interval_ms: f64,
    /// Restart delay after a failed run
    pub retry_delay_ms: f64,
    /// How long the completion notice stays visible
    pub completion_notice_ms: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_CALIBRATION_DURATION_MS,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            completion_notice_ms: DEFAULT_COMPLETION_NOTICE_MS,
        }
    }
}

/// Head pose heuristics
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadConfig {
    /// Detector capture width; landmarks are scaled to pixels before use
    pub frame_width: f32,
    /// Detector capture height
    pub frame_height: f32,
    pub pitch_divisor: f32,
    pub yaw_limit: f32,
    pub yaw_epsilon: f32,
    pub sensitivity: AxisSensitivity,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            pitch_divisor: DEFAULT_PITCH_DIVISOR,
            yaw_limit: DEFAULT_YAW_LIMIT,
            yaw_epsilon: DEFAULT_YAW_EPSILON,
            sensitivity: AxisSensitivity::default(),
        }
    }
}

/// Body heuristics
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    pub torso: AxisSensitivity,
    pub arms: AxisSensitivity,
    pub forearms: AxisSensitivity,
    pub shoulder_sensitivity: f32,
    pub min_segment_length: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            torso: AxisSensitivity::default(),
            arms: AxisSensitivity::default(),
            forearms: AxisSensitivity::default(),
            shoulder_sensitivity: 1.0,
            min_segment_length: MIN_SEGMENT_LENGTH,
        }
    }
}

/// Frame pipeline behaviour
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Start calibrating automatically this long after the first frame
    pub auto_start: bool,
    pub auto_start_delay_ms: f64,
    /// Restart a failed calibration run automatically
    pub auto_retry: bool,
    /// A detection unresolved for this long is abandoned
    pub detection_timeout_ms: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            auto_start_delay_ms: DEFAULT_AUTO_START_DELAY_MS,
            auto_retry: true,
            detection_timeout_ms: DEFAULT_DETECTION_TIMEOUT_MS,
        }
    }
}

/// Complete tracker configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub calibration: CalibrationConfig,
    pub head: HeadConfig,
    pub body: BodyConfig,
    pub pipeline: PipelineConfig,
    pub rig: RigMapping,
}

impl TrackerConfig {
    /// Parse and validate a config from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to JSON string
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the estimator or session cannot work with
    pub fn validate(&self) -> Result<()> {
        self.check().map_err(TrackerError::Config)
    }

    fn check(&self) -> std::result::Result<(), String> {
        let cal = &self.calibration;
        Limits::check_positive_ms("calibration.duration_ms", cal.duration_ms)?;
        Limits::check_positive_ms("calibration.sample_interval_ms", cal.sample_interval_ms)?;
        Limits::check_delay_ms("calibration.retry_delay_ms", cal.retry_delay_ms)?;
        Limits::check_delay_ms("calibration.completion_notice_ms", cal.completion_notice_ms)?;
        Limits::check_delay_ms(
            "pipeline.auto_start_delay_ms",
            self.pipeline.auto_start_delay_ms,
        )?;
        Limits::check_positive_ms(
            "pipeline.detection_timeout_ms",
            self.pipeline.detection_timeout_ms,
        )?;

        let head = &self.head;
        if !(head.frame_width > 0.0 && head.frame_height > 0.0) {
            return Err(format!(
                "head frame size must be positive, got {}x{}",
                head.frame_width, head.frame_height
            ));
        }
        if !(head.pitch_divisor.is_finite() && head.pitch_divisor > 0.0) {
            return Err(format!("head.pitch_divisor must be > 0, got {}", head.pitch_divisor));
        }
        if !(head.yaw_limit.is_finite() && head.yaw_limit > 0.0) {
            return Err(format!("head.yaw_limit must be > 0, got {}", head.yaw_limit));
        }
        if !(head.yaw_epsilon.is_finite() && head.yaw_epsilon >= 0.0) {
            return Err(format!("head.yaw_epsilon must be >= 0, got {}", head.yaw_epsilon));
        }
        head.sensitivity.validate("head")?;

        let body = &self.body;
        body.torso.validate("torso")?;
        body.arms.validate("arms")?;
        body.forearms.validate("forearms")?;
        Limits::check_sensitivity("shoulders", body.shoulder_sensitivity)?;
        if !(body.min_segment_length.is_finite() && body.min_segment_length > 0.0) {
            return Err(format!(
                "body.min_segment_length must be > 0, got {}",
                body.min_segment_length
            ));
        }
        Ok(())
    }
}
