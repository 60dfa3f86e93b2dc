//! Per-frame input and output values
//!
//! `FrameInput` is what the page hands over after running its detectors;
//! `PoseFrame` is the calibrated composite sent to observers. Observers
//! that only care about one joint subscribe to a `JointStream` instead.

use crate::angles::{JointAngles, Sides};
use crate::calibration::CalibrationStatus;
use crate::estimator::FaceExpression;
use crate::landmark::{BlendshapeCategory, LandmarkSet};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Detector output for one camera frame.
///
/// A landmark list that is absent and one that is empty both mean "no
/// subject tracked". A missing timestamp reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInput {
    #[serde(default)]
    pub timestamp_ms: f64,
    #[serde(default)]
    pub pose_landmarks: Option<LandmarkSet>,
    #[serde(default)]
    pub face_landmarks: Option<LandmarkSet>,
    #[serde(default)]
    pub blendshapes: Option<Vec<BlendshapeCategory>>,
}

impl FrameInput {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Which joints carried an estimate this frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackedJoints {
    pub head: bool,
    pub torso: bool,
    pub shoulders: Sides<bool>,
    pub arms: Sides<bool>,
    pub forearms: Sides<bool>,
}

impl TrackedJoints {
    /// True if any body joint was tracked
    pub fn any_body(&self) -> bool {
        let any = |s: Sides<bool>| s.left || s.right;
        self.torso || any(self.shoulders) || any(self.arms) || any(self.forearms)
    }
}

/// Calibrated pose for one frame.
///
/// Joints that were not tracked this frame read as zero and are false in
/// `tracked`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseFrame {
    pub timestamp_ms: f64,
    pub head: JointAngles,
    pub torso: JointAngles,
    pub shoulders: Sides<f32>,
    pub arms: Sides<JointAngles>,
    pub forearms: Sides<JointAngles>,
    pub face: Option<FaceExpression>,
    pub wrists: Option<Sides<Vec3>>,
    pub tracked: TrackedJoints,
}

/// Sub-streams of the composite frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JointStream {
    Head,
    Torso,
    Shoulders,
    Arms,
    Forearms,
    Face,
    Wrists,
}

impl JointStream {
    pub const ALL: [JointStream; 7] = [
        JointStream::Head,
        JointStream::Torso,
        JointStream::Shoulders,
        JointStream::Arms,
        JointStream::Forearms,
        JointStream::Face,
        JointStream::Wrists,
    ];

    /// Parse a stream name as used from JavaScript ("head", "arms", ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            JointStream::Head => "head",
            JointStream::Torso => "torso",
            JointStream::Shoulders => "shoulders",
            JointStream::Arms => "arms",
            JointStream::Forearms => "forearms",
            JointStream::Face => "face",
            JointStream::Wrists => "wrists",
        }
    }
}

/// One joint's slice of a `PoseFrame`. An untracked side is null.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "joint", content = "value", rename_all = "snake_case")]
pub enum JointUpdate {
    Head(JointAngles),
    Torso(JointAngles),
    Shoulders(Sides<Option<f32>>),
    Arms(Sides<Option<JointAngles>>),
    Forearms(Sides<Option<JointAngles>>),
    Face(FaceExpression),
    Wrists(Sides<Vec3>),
}

/// The tracked sides of a pair, or None when neither side was tracked
fn tracked_sides<T>(values: Sides<T>, tracked: Sides<bool>) -> Option<Sides<Option<T>>> {
    (tracked.left || tracked.right).then(|| values.zip(tracked, |v, t| t.then_some(v)))
}

impl PoseFrame {
    /// The part of this frame carried by `stream`, if it was tracked
    pub fn joint(&self, stream: JointStream) -> Option<JointUpdate> {
        let tracked = &self.tracked;
        match stream {
            JointStream::Head => tracked.head.then_some(JointUpdate::Head(self.head)),
            JointStream::Torso => tracked.torso.then_some(JointUpdate::Torso(self.torso)),
            JointStream::Shoulders => tracked_sides(self.shoulders, tracked.shoulders).map(JointUpdate::Shoulders),
            JointStream::Arms => tracked_sides(self.arms, tracked.arms).map(JointUpdate::Arms),
            JointStream::Forearms => tracked_sides(self.forearms, tracked.forearms).map(JointUpdate::Forearms),
            JointStream::Face => self.face.map(JointUpdate::Face),
            JointStream::Wrists => self.wrists.map(JointUpdate::Wrists),
        }
    }
}

/// Receives every calibrated frame
pub trait PoseObserver {
    fn on_pose_frame(&mut self, frame: &PoseFrame);

    /// Called when calibration starts, completes or fails
    fn on_calibration(&mut self, _status: &CalibrationStatus) {}
}

impl<F: FnMut(&PoseFrame)> PoseObserver for F {
    fn on_pose_frame(&mut self, frame: &PoseFrame) {
        self(frame)
    }
}
