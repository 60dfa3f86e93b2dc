//! Calibration session
//!
//! The subject holds a neutral pose for a fixed window while the session
//! records estimator output every `sample_interval_ms`. When the window
//! elapses the samples are averaged into a per-joint offset that is
//! subtracted from every later frame, so the neutral pose reads as zero.
//!
//! A run that collects nothing, or whose mean is not finite, resets the
//! offset to zero, marks the session uncalibrated and schedules a retry.

use crate::angles::{BodyAngles, JointAngles, Sides};
use crate::config::CalibrationConfig;
use crate::error::CalibrationError;
use crate::estimator::{BodyEstimate, PoseEstimate};
use crate::frame::{PoseFrame, TrackedJoints};
use serde::Serialize;
use std::ops::Sub;

/// One frame's joint estimates recorded during the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    pub head: Option<JointAngles>,
    pub body: Option<BodyEstimate>,
}

impl CalibrationSample {
    /// Returns None when no calibrated joint was tracked
    pub fn from_estimate(estimate: &PoseEstimate) -> Option<Self> {
        estimate.has_joints().then_some(Self {
            head: estimate.head,
            body: estimate.body,
        })
    }
}

/// Per-joint bias subtracted from live estimates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CalibrationOffset {
    pub head: JointAngles,
    pub body: BodyAngles,
}

impl CalibrationOffset {
    pub const ZERO: Self = Self {
        head: JointAngles::ZERO,
        body: BodyAngles::ZERO,
    };

    pub fn is_finite(&self) -> bool {
        self.head.is_finite() && self.body.is_finite()
    }
}

/// Incremental mean update: `mean += (x - mean) / n`.
///
/// A constant sequence leaves the mean bit-identical to the constant.
trait RunningMean {
    fn accumulate(&mut self, sample: &Self, n: f32);
}

impl RunningMean for f32 {
    fn accumulate(&mut self, sample: &Self, n: f32) {
        *self += (*sample - *self) / n;
    }
}

impl RunningMean for JointAngles {
    fn accumulate(&mut self, sample: &Self, n: f32) {
        self.pitch.accumulate(&sample.pitch, n);
        self.yaw.accumulate(&sample.yaw, n);
        self.roll.accumulate(&sample.roll, n);
    }
}

/// Mean of one joint over the samples that tracked it
#[derive(Debug, Clone, Copy, Default)]
struct JointMean<T> {
    mean: T,
    count: u32,
}

impl<T: RunningMean> JointMean<T> {
    fn push(&mut self, sample: Option<&T>) {
        if let Some(sample) = sample {
            self.count += 1;
            self.mean.accumulate(sample, self.count as f32);
        }
    }
}

fn push_sides<T: RunningMean>(means: &mut Sides<JointMean<T>>, sample: &Sides<Option<T>>) {
    means.left.push(sample.left.as_ref());
    means.right.push(sample.right.as_ref());
}

#[derive(Debug, Default)]
struct OffsetAccumulator {
    head: JointMean<JointAngles>,
    torso: JointMean<JointAngles>,
    shoulders: Sides<JointMean<f32>>,
    arms: Sides<JointMean<JointAngles>>,
    forearms: Sides<JointMean<JointAngles>>,
}

impl OffsetAccumulator {
    fn push(&mut self, sample: &CalibrationSample) {
        self.head.push(sample.head.as_ref());
        if let Some(body) = &sample.body {
            self.torso.push(body.torso.as_ref());
            push_sides(&mut self.shoulders, &body.shoulders);
            push_sides(&mut self.arms, &body.arms);
            push_sides(&mut self.forearms, &body.forearms);
        }
    }

    fn tracked_count(&self) -> u32 {
        let pair = |s: Sides<u32>| s.left + s.right;
        self.head.count
            + self.torso.count
            + pair(self.shoulders.map(|m| m.count))
            + pair(self.arms.map(|m| m.count))
            + pair(self.forearms.map(|m| m.count))
    }

    fn offset(&self) -> CalibrationOffset {
        CalibrationOffset {
            head: self.head.mean,
            body: BodyAngles {
                torso: self.torso.mean,
                shoulders: self.shoulders.map(|m| m.mean),
                arms: self.arms.map(|m| m.mean),
                forearms: self.forearms.map(|m| m.mean),
            },
        }
    }
}

/// Average the recorded samples into an offset.
///
/// Each joint is averaged over the samples in which it was tracked; a joint
/// never seen during the window gets a zero offset.
pub fn calculate_offset(samples: &[CalibrationSample]) -> Result<CalibrationOffset, CalibrationError> {
    let mut acc = OffsetAccumulator::default();
    for sample in samples {
        acc.push(sample);
    }

    if acc.tracked_count() == 0 {
        return Err(CalibrationError::Empty);
    }
    let offset = acc.offset();
    if !offset.is_finite() {
        return Err(CalibrationError::Invalid);
    }
    Ok(offset)
}

fn remove_bias<T: Sub<Output = T>>(live: Sides<Option<T>>, bias: Sides<T>) -> Sides<Option<T>> {
    live.zip(bias, |v, b| v.map(|v| v - b))
}

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CalibrationPhase {
    Idle,
    Calibrating {
        started_at: f64,
        last_sample_at: Option<f64>,
    },
    Calibrated,
}

/// Result of feeding one frame to the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationEvent {
    /// The frame was recorded
    Sampled,
    /// Not calibrating, too soon after the last sample, or nothing tracked
    Skipped,
    /// The window elapsed and a new offset was committed
    Completed(CalibrationOffset),
    /// The window elapsed without a usable offset
    Failed(CalibrationError),
}

/// Snapshot of the session for UI feedback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationStatus {
    pub phase: CalibrationPhase,
    pub progress: f32,
    pub calibrated: bool,
    pub sample_count: usize,
    pub message: Option<String>,
}

/// Calibration state owned by one pipeline
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    config: CalibrationConfig,
    phase: CalibrationPhase,
    samples: Vec<CalibrationSample>,
    offset: CalibrationOffset,
    calibrated: bool,
    retry_at: Option<f64>,
    completed_at: Option<f64>,
    last_error: Option<CalibrationError>,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

impl CalibrationSession {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            phase: CalibrationPhase::Idle,
            samples: Vec::new(),
            offset: CalibrationOffset::ZERO,
            calibrated: false,
            retry_at: None,
            completed_at: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn offset(&self) -> &CalibrationOffset {
        &self.offset
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.phase, CalibrationPhase::Calibrating { .. })
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn last_error(&self) -> Option<CalibrationError> {
        self.last_error
    }

    /// Time at which a failed run should be restarted
    pub fn retry_at(&self) -> Option<f64> {
        self.retry_at
    }

    /// True once a failed run's retry delay has passed
    pub fn retry_due(&self, now: f64) -> bool {
        self.phase == CalibrationPhase::Idle && self.retry_at.is_some_and(|at| now >= at)
    }

    /// Begin a new run. The committed offset stays in effect until the run
    /// finishes.
    pub fn start(&mut self, now: f64) {
        log::info!("Calibration started ({} ms window)", self.config.duration_ms);
        self.phase = CalibrationPhase::Calibrating {
            started_at: now,
            last_sample_at: None,
        };
        self.samples.clear();
        self.retry_at = None;
        self.completed_at = None;
    }

    /// Abort a run in progress, discarding its samples
    pub fn cancel(&mut self) {
        if !self.is_calibrating() {
            return;
        }
        log::info!("Calibration cancelled after {} samples", self.samples.len());
        self.samples.clear();
        self.phase = if self.calibrated {
            CalibrationPhase::Calibrated
        } else {
            CalibrationPhase::Idle
        };
    }

    /// Fraction of the window elapsed, in [0, 1]
    pub fn progress(&self, now: f64) -> f32 {
        match self.phase {
            CalibrationPhase::Calibrating { started_at, .. } => {
                ((now - started_at) / self.config.duration_ms).clamp(0.0, 1.0) as f32
            }
            CalibrationPhase::Calibrated => 1.0,
            CalibrationPhase::Idle => 0.0,
        }
    }

    /// Feed one frame's estimate
    pub fn tick(&mut self, now: f64, estimate: &PoseEstimate) -> CalibrationEvent {
        let CalibrationPhase::Calibrating {
            started_at,
            last_sample_at,
        } = self.phase
        else {
            return CalibrationEvent::Skipped;
        };

        if now - started_at >= self.config.duration_ms {
            return self.finish(now);
        }

        let due = last_sample_at.is_none_or(|last| now - last >= self.config.sample_interval_ms);
        if !due {
            return CalibrationEvent::Skipped;
        }

        match CalibrationSample::from_estimate(estimate) {
            Some(sample) => {
                self.samples.push(sample);
                self.phase = CalibrationPhase::Calibrating {
                    started_at,
                    last_sample_at: Some(now),
                };
                CalibrationEvent::Sampled
            }
            None => CalibrationEvent::Skipped,
        }
    }

    fn finish(&mut self, now: f64) -> CalibrationEvent {
        let result = calculate_offset(&self.samples);
        let sample_count = self.samples.len();
        self.samples.clear();

        match result {
            Ok(offset) => {
                log::info!("Calibration complete from {} samples", sample_count);
                self.offset = offset;
                self.calibrated = true;
                self.phase = CalibrationPhase::Calibrated;
                self.completed_at = Some(now);
                self.last_error = None;
                CalibrationEvent::Completed(offset)
            }
            Err(err) => {
                log::warn!("Calibration failed: {}", err);
                self.offset = CalibrationOffset::ZERO;
                self.calibrated = false;
                self.phase = CalibrationPhase::Idle;
                self.retry_at = Some(now + self.config.retry_delay_ms);
                self.last_error = Some(err);
                CalibrationEvent::Failed(err)
            }
        }
    }

    /// Subtract the committed offset from a live estimate.
    ///
    /// Joints missing from the estimate read zero and are marked untracked.
    pub fn apply(&self, timestamp_ms: f64, estimate: &PoseEstimate) -> PoseFrame {
        let bias = &self.offset;
        let head = estimate.head.map(|h| h - bias.head);
        let body = estimate.body.unwrap_or_default();
        let torso = body.torso.map(|t| t - bias.body.torso);

        let (shoulders, shoulders_tracked) = remove_bias(body.shoulders, bias.body.shoulders).unzip_tracked();
        let (arms, arms_tracked) = remove_bias(body.arms, bias.body.arms).unzip_tracked();
        let (forearms, forearms_tracked) = remove_bias(body.forearms, bias.body.forearms).unzip_tracked();

        PoseFrame {
            timestamp_ms,
            head: head.unwrap_or_default(),
            torso: torso.unwrap_or_default(),
            shoulders,
            arms,
            forearms,
            face: estimate.face,
            wrists: estimate.wrists,
            tracked: TrackedJoints {
                head: head.is_some(),
                torso: torso.is_some(),
                shoulders: shoulders_tracked,
                arms: arms_tracked,
                forearms: forearms_tracked,
            },
        }
    }

    pub fn status(&self, now: f64) -> CalibrationStatus {
        let progress = self.progress(now);
        let message = match self.phase {
            CalibrationPhase::Calibrating { .. } => {
                Some(format!("Calibrating... {}%", (progress * 100.0).round() as u32))
            }
            CalibrationPhase::Calibrated => self
                .completed_at
                .filter(|at| now - at < self.config.completion_notice_ms)
                .map(|_| "Calibration complete!".to_string()),
            CalibrationPhase::Idle => self
                .retry_at
                .map(|_| "Calibration failed, retrying...".to_string()),
        };

        CalibrationStatus {
            phase: self.phase,
            progress,
            calibrated: self.calibrated,
            sample_count: self.samples.len(),
            message,
        }
    }
}
