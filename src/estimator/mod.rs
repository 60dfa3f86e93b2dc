//! Landmark-to-angle estimation
//!
//! Pure functions from one frame's landmarks to joint angle estimates.
//! Nothing is carried between frames: the same input always gives the same
//! output, and missing or degenerate landmarks give zero for the affected
//! joint only.

pub mod face;
pub mod head;
pub mod limb;
pub mod torso;

pub use face::*;
pub use head::*;
pub use limb::*;
pub use torso::*;

use crate::angles::{JointAngles, Sides};
use crate::config::{BodyConfig, HeadConfig, TrackerConfig};
use crate::error::Result;
use crate::frame::FrameInput;
use crate::landmark::{pose, LandmarkSet};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Body joint estimates from one pose detector result.
///
/// A joint is None when its landmarks were missing or degenerate this
/// frame; the other joints are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct BodyEstimate {
    pub torso: Option<JointAngles>,
    pub shoulders: Sides<Option<f32>>,
    pub arms: Sides<Option<JointAngles>>,
    pub forearms: Sides<Option<JointAngles>>,
}

impl BodyEstimate {
    /// True when every estimated joint is finite
    pub fn is_finite(&self) -> bool {
        let angles = |s: Sides<Option<JointAngles>>| {
            s.left.is_none_or(|a| a.is_finite()) && s.right.is_none_or(|a| a.is_finite())
        };
        self.torso.is_none_or(|t| t.is_finite())
            && self.shoulders.left.is_none_or(f32::is_finite)
            && self.shoulders.right.is_none_or(f32::is_finite)
            && angles(self.arms)
            && angles(self.forearms)
    }

    /// True if at least one joint was estimated
    pub fn has_joints(&self) -> bool {
        let any = |s: Sides<bool>| s.left || s.right;
        self.torso.is_some()
            || any(self.shoulders.map(|v| v.is_some()))
            || any(self.arms.map(|v| v.is_some()))
            || any(self.forearms.map(|v| v.is_some()))
    }
}

/// Uncalibrated estimates for one frame.
///
/// `head` is None when no face was tracked, `body` when no body was.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseEstimate {
    pub head: Option<JointAngles>,
    pub body: Option<BodyEstimate>,
    pub face: Option<FaceExpression>,
    pub wrists: Option<Sides<Vec3>>,
}

impl PoseEstimate {
    /// True if at least one calibrated joint was tracked
    pub fn has_joints(&self) -> bool {
        self.head.is_some() || self.body.is_some_and(|b| b.has_joints())
    }
}

fn side_point(body: &LandmarkSet, left: usize, right: usize) -> Sides<Option<Vec3>> {
    Sides::new(body.point(left), body.point(right))
}

fn require_point(body: &LandmarkSet, index: usize) -> Result<Vec3> {
    body.require(index).map(|lm| lm.to_vec3())
}

/// Keep a joint's estimate, or log why there is none
fn tracked<T>(joint: &str, estimate: Result<T>) -> Option<T> {
    estimate.map_err(|e| log::debug!("{}: {}", joint, e)).ok()
}

fn torso_from(body: &LandmarkSet, min_length: f32) -> Result<JointAngles> {
    torso::torso_angles(
        require_point(body, pose::LEFT_SHOULDER)?,
        require_point(body, pose::RIGHT_SHOULDER)?,
        require_point(body, pose::LEFT_HIP)?,
        require_point(body, pose::RIGHT_HIP)?,
        min_length,
    )
}

/// Torso, shoulder, arm and forearm angles for every joint whose landmarks
/// are present
fn estimate_body(body: &LandmarkSet, config: &BodyConfig) -> BodyEstimate {
    let shoulders = side_point(body, pose::LEFT_SHOULDER, pose::RIGHT_SHOULDER);
    let elbows = side_point(body, pose::LEFT_ELBOW, pose::RIGHT_ELBOW);
    let wrists = side_point(body, pose::LEFT_WRIST, pose::RIGHT_WRIST);
    let knuckles = side_point(body, pose::LEFT_INDEX, pose::RIGHT_INDEX);
    let min_len = config.min_segment_length;

    let torso = tracked("torso", torso_from(body, min_len)).map(|t| t.scaled(&config.torso));

    let shoulder_angles = shoulders.zip(elbows, |s, e| {
        let (s, e) = s.zip(e)?;
        tracked("shoulder", limb::shoulder_angle(s.truncate(), e.truncate()))
            .map(|a| a * config.shoulder_sensitivity)
    });

    let upper = shoulders.zip(elbows, |s, e| (s, e)).zip(wrists, |(s, e), w| (s, e, w));
    let arms = upper.map(|(s, e, w)| {
        let ((s, e), w) = s.zip(e).zip(w)?;
        tracked("upper arm", limb::limb_rotation(s, e, w, min_len)).map(|a| a.scaled(&config.arms))
    });

    let lower = elbows.zip(wrists, |e, w| (e, w)).zip(knuckles, |(e, w), k| (e, w, k));
    let forearms = lower.map(|(e, w, k)| {
        let ((e, w), k) = e.zip(w).zip(k)?;
        tracked("forearm", limb::limb_rotation(e, w, k, min_len)).map(|a| a.scaled(&config.forearms))
    });

    BodyEstimate {
        torso,
        shoulders: shoulder_angles,
        arms,
        forearms,
    }
}

/// Runs every estimator over one frame's detector output
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseEstimator {
    head: HeadConfig,
    body: BodyConfig,
}

impl PoseEstimator {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            head: config.head,
            body: config.body,
        }
    }

    /// Estimate all joints for one frame
    pub fn estimate(&self, input: &FrameInput) -> PoseEstimate {
        let face = input.face_landmarks.as_ref().filter(|set| !set.is_empty());
        let body = input.pose_landmarks.as_ref().filter(|set| !set.is_empty());

        let head = face.and_then(|f| estimate_head_pose(f, &self.head));
        let expression = estimate_face_expression(face, input.blendshapes.as_deref());

        let wrists = body.and_then(|b| {
            Some(Sides::new(b.point(pose::LEFT_WRIST)?, b.point(pose::RIGHT_WRIST)?))
        });

        PoseEstimate {
            head,
            body: body.map(|b| estimate_body(b, &self.body)),
            face: expression,
            wrists,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::head::tests::face_with;
    use super::*;
    use crate::landmark::Landmark;
    use rand::Rng;
    use wasm_bindgen_test::*;

    /// Standing subject, arms hanging, hands slightly in front
    pub(crate) fn standing_body() -> LandmarkSet {
        let points = [
            (pose::LEFT_SHOULDER, (0.6, 0.3, 0.0)),
            (pose::RIGHT_SHOULDER, (0.4, 0.3, 0.0)),
            (pose::LEFT_ELBOW, (0.62, 0.45, 0.0)),
            (pose::RIGHT_ELBOW, (0.38, 0.45, 0.0)),
            (pose::LEFT_WRIST, (0.63, 0.6, -0.05)),
            (pose::RIGHT_WRIST, (0.37, 0.6, -0.05)),
            (pose::LEFT_INDEX, (0.63, 0.65, -0.06)),
            (pose::RIGHT_INDEX, (0.37, 0.65, -0.06)),
            (pose::LEFT_HIP, (0.58, 0.7, 0.0)),
            (pose::RIGHT_HIP, (0.42, 0.7, 0.0)),
        ];
        points
            .iter()
            .fold(LandmarkSet::default(), |set, &(index, (x, y, z))| {
                set.with_landmark(index, Landmark::new(x, y, z))
            })
    }

    pub(crate) fn full_input(timestamp_ms: f64) -> FrameInput {
        FrameInput {
            timestamp_ms,
            pose_landmarks: Some(standing_body()),
            face_landmarks: Some(face_with((0.5, 0.2), (0.47, 0.18), (0.53, 0.18))),
            blendshapes: None,
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_full_frame_estimates_every_joint() {
        let estimator = PoseEstimator::default();
        let estimate = estimator.estimate(&full_input(0.0));

        assert!(estimate.head.is_some());
        let body = estimate.body.unwrap();
        assert!(body.is_finite());
        assert!(body.torso.is_some());
        assert!(body.shoulders.left.is_some() && body.shoulders.right.is_some());
        assert_ne!(body.arms.left, Some(JointAngles::ZERO));
        assert!(body.forearms.right.is_some());
        assert!(estimate.wrists.is_some());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_estimator_is_idempotent() {
        let estimator = PoseEstimator::default();
        let input = full_input(0.0);
        let a = estimator.estimate(&input);
        let b = estimator.estimate(&input);
        assert_eq!(a, b);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_random_landmarks_never_produce_nan() {
        let mut rng = rand::rng();
        let estimator = PoseEstimator::default();

        for _ in 0..200 {
            let mut random_set = |n: usize| {
                LandmarkSet::new(
                    (0..n)
                        .map(|_| Landmark::new(rng.random(), rng.random(), rng.random_range(-0.5..0.5)))
                        .collect(),
                )
            };
            let input = FrameInput {
                timestamp_ms: 0.0,
                pose_landmarks: Some(random_set(33)),
                face_landmarks: Some(random_set(478)),
                blendshapes: None,
            };

            let first = estimator.estimate(&input);
            assert!(first.head.unwrap().is_finite());
            assert!(first.body.unwrap().is_finite());
            assert_eq!(first, estimator.estimate(&input));
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_missing_elbow_drops_that_side_only() {
        let body = standing_body().with_landmark(pose::LEFT_ELBOW, Landmark::new(f32::NAN, 0.0, 0.0));
        let input = FrameInput {
            timestamp_ms: 0.0,
            pose_landmarks: Some(body),
            face_landmarks: None,
            blendshapes: None,
        };
        let body = PoseEstimator::default().estimate(&input).body.unwrap();

        assert_eq!(body.shoulders.left, None);
        assert_eq!(body.arms.left, None);
        assert_eq!(body.forearms.left, None);
        assert!(body.arms.right.is_some());
        assert!(body.torso.is_some());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_missing_hip_leaves_limbs_tracked() {
        let body = standing_body().with_landmark(pose::LEFT_HIP, Landmark::new(f32::NAN, 0.0, 0.0));
        let input = FrameInput {
            timestamp_ms: 0.0,
            pose_landmarks: Some(body),
            face_landmarks: None,
            blendshapes: None,
        };
        let estimate = PoseEstimator::default().estimate(&input);
        let body = estimate.body.unwrap();

        assert_eq!(body.torso, None);
        assert!(body.shoulders.left.is_some());
        assert!(body.arms.left.is_some() && body.forearms.right.is_some());
        assert!(estimate.has_joints());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_no_subject_means_no_joints() {
        let input = FrameInput {
            timestamp_ms: 0.0,
            pose_landmarks: Some(LandmarkSet::default()),
            face_landmarks: None,
            blendshapes: None,
        };
        let estimate = PoseEstimator::default().estimate(&input);
        assert!(!estimate.has_joints());
        assert!(estimate.face.is_none());
    }
}
