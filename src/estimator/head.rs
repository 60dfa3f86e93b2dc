use crate::angles::JointAngles;
use crate::config::HeadConfig;
use crate::error::Result;
use crate::landmark::{face, LandmarkSet};
use glam::Vec2;

/// The seven face points the head estimator reads, in pixel space
#[derive(Debug, Clone, Copy)]
pub struct HeadKeypoints {
    pub nose: Vec2,
    pub left_eye: Vec2,
    pub right_eye: Vec2,
    pub left_ear: Vec2,
    pub right_ear: Vec2,
    pub left_mouth: Vec2,
    pub right_mouth: Vec2,
}

impl HeadKeypoints {
    /// Select the keypoints and scale them to the detector's frame size
    pub fn from_landmarks(landmarks: &LandmarkSet, width: f32, height: f32) -> Result<Self> {
        let scale = Vec2::new(width, height);
        let px = |index: usize| landmarks.require(index).map(|lm| lm.to_vec2() * scale);

        Ok(Self {
            nose: px(face::NOSE)?,
            left_eye: px(face::LEFT_EYE)?,
            right_eye: px(face::RIGHT_EYE)?,
            left_ear: px(face::LEFT_EAR)?,
            right_ear: px(face::RIGHT_EAR)?,
            left_mouth: px(face::LEFT_MOUTH)?,
            right_mouth: px(face::RIGHT_MOUTH)?,
        })
    }
}

/// Angle of a line in the image plane, folded so that the direction the
/// line is drawn in does not matter. Result lies in [-PI/2, PI/2].
pub(crate) fn line_roll(direction: Vec2) -> f32 {
    let d = if direction.x < 0.0 { -direction } else { direction };
    d.y.atan2(d.x)
}

/// Yaw from the nose-to-eye distance ratio.
///
/// ln(left / right) is zero when the nose sits midway between the eyes.
/// A distance below `yaw_epsilon` saturates to the configured limit on
/// that side instead of diverging.
fn saturating_yaw(d_left: f32, d_right: f32, config: &HeadConfig) -> f32 {
    let limit = config.yaw_limit;
    let eps = config.yaw_epsilon;

    match (d_left < eps, d_right < eps) {
        (true, true) => {
            log::debug!("head yaw: both nose-to-eye distances degenerate");
            0.0
        }
        (true, false) => -limit,
        (false, true) => limit,
        (false, false) => ((d_left / d_right).ln() * config.sensitivity.yaw).clamp(-limit, limit),
    }
}

/// Approximate head rotation from face landmarks.
///
/// No camera model is involved: the numbers are scaled heuristics that read
/// zero for a level, frontal face and drift with distance to the camera.
pub fn estimate_head_pose(landmarks: &LandmarkSet, config: &HeadConfig) -> Option<JointAngles> {
    let kp = match HeadKeypoints::from_landmarks(landmarks, config.frame_width, config.frame_height) {
        Ok(kp) => kp,
        Err(e) => {
            log::debug!("head pose: {}", e);
            return None;
        }
    };

    let roll = line_roll(kp.right_eye - kp.left_eye) * config.sensitivity.roll;

    let d_left = kp.nose.distance(kp.left_eye);
    let d_right = kp.nose.distance(kp.right_eye);
    let yaw = saturating_yaw(d_left, d_right, config);

    let eye_mid_y = (kp.left_eye.y + kp.right_eye.y) / 2.0;
    let pitch = (eye_mid_y - kp.nose.y) / config.pitch_divisor * config.sensitivity.pitch;

    Some(JointAngles { pitch, yaw, roll })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::landmark::Landmark;
    use wasm_bindgen_test::*;

    /// Face with the given nose and eyes; ears and mouth placed plausibly
    pub(crate) fn face_with(nose: (f32, f32), left_eye: (f32, f32), right_eye: (f32, f32)) -> LandmarkSet {
        LandmarkSet::default()
            .with_landmark(face::NOSE, Landmark::new(nose.0, nose.1, 0.0))
            .with_landmark(face::LEFT_EYE, Landmark::new(left_eye.0, left_eye.1, 0.0))
            .with_landmark(face::RIGHT_EYE, Landmark::new(right_eye.0, right_eye.1, 0.0))
            .with_landmark(face::LEFT_EAR, Landmark::new(nose.0 - 0.1, nose.1, 0.0))
            .with_landmark(face::RIGHT_EAR, Landmark::new(nose.0 + 0.1, nose.1, 0.0))
            .with_landmark(face::LEFT_MOUTH, Landmark::new(nose.0 - 0.03, nose.1 + 0.06, 0.0))
            .with_landmark(face::RIGHT_MOUTH, Landmark::new(nose.0 + 0.03, nose.1 + 0.06, 0.0))
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_level_frontal_face_is_zero() {
        let face = face_with((0.5, 0.4), (0.45, 0.4), (0.55, 0.4));
        let head = estimate_head_pose(&face, &HeadConfig::default()).unwrap();

        assert_eq!(head.roll, 0.0);
        assert_eq!(head.pitch, 0.0);
        assert!(head.yaw.abs() < 1e-6, "yaw should be ~0, got {}", head.yaw);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_mirrored_eye_order_still_level() {
        // Same face with left/right swapped
        let face = face_with((0.5, 0.4), (0.55, 0.4), (0.45, 0.4));
        let head = estimate_head_pose(&face, &HeadConfig::default()).unwrap();
        assert_eq!(head.roll, 0.0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_pitch_uses_pixel_offset() {
        // Eyes 0.05 * 720 = 36 px above the nose
        let face = face_with((0.5, 0.45), (0.45, 0.4), (0.55, 0.4));
        let head = estimate_head_pose(&face, &HeadConfig::default()).unwrap();
        let expected = (0.4 * 720.0 - 0.45 * 720.0) / 50.0;
        assert!((head.pitch - expected).abs() < 1e-4, "pitch {} vs {}", head.pitch, expected);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_roll_follows_eye_line() {
        let face = face_with((0.5, 0.4), (0.45, 0.4), (0.55, 0.45));
        let head = estimate_head_pose(&face, &HeadConfig::default()).unwrap();
        let expected = (0.05_f32 * 720.0).atan2(0.1 * 1280.0);
        assert!((head.roll - expected).abs() < 1e-5);
        assert!(head.roll > 0.0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_yaw_sign_follows_closer_eye() {
        // Nose shifted toward the left eye
        let face = face_with((0.47, 0.4), (0.45, 0.4), (0.55, 0.4));
        let head = estimate_head_pose(&face, &HeadConfig::default()).unwrap();
        assert!(head.yaw < 0.0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_yaw_saturates_when_nose_on_eye() {
        let config = HeadConfig::default();
        let face = face_with((0.45, 0.4), (0.45, 0.4), (0.55, 0.4));
        let head = estimate_head_pose(&face, &config).unwrap();
        assert_eq!(head.yaw, -config.yaw_limit);

        let face = face_with((0.55, 0.4), (0.45, 0.4), (0.55, 0.4));
        let head = estimate_head_pose(&face, &config).unwrap();
        assert_eq!(head.yaw, config.yaw_limit);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_collapsed_face_is_finite() {
        let face = face_with((0.5, 0.4), (0.5, 0.4), (0.5, 0.4));
        let head = estimate_head_pose(&face, &HeadConfig::default()).unwrap();
        assert!(head.is_finite());
        assert_eq!(head.yaw, 0.0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_missing_keypoint_returns_none() {
        let face = LandmarkSet::default()
            .with_landmark(face::NOSE, Landmark::new(0.5, 0.4, 0.0))
            .with_landmark(face::LEFT_EYE, Landmark::new(0.45, 0.4, 0.0));
        assert!(estimate_head_pose(&face, &HeadConfig::default()).is_none());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_sensitivity_scales_pitch() {
        let face = face_with((0.5, 0.45), (0.45, 0.4), (0.55, 0.4));
        let base = estimate_head_pose(&face, &HeadConfig::default()).unwrap();

        let mut config = HeadConfig::default();
        config.sensitivity.pitch = 2.0;
        let scaled = estimate_head_pose(&face, &config).unwrap();
        assert!((scaled.pitch - 2.0 * base.pitch).abs() < 1e-5);
    }
}
