use super::head::line_roll;
use super::limb::{direction_pitch_yaw, unit_segment};
use crate::angles::JointAngles;
use crate::error::{Result, TrackerError};
use crate::tracker_constants::MIN_SEGMENT_LENGTH;
use glam::Vec3;

/// Torso lean and twist from shoulders and hips.
///
/// The spine runs from the hip centre to the shoulder centre; its direction
/// gives pitch and yaw with the same formulas as a limb. Roll is the tilt of
/// the shoulder line. Any missing or non-finite landmark, or a spine or
/// shoulder line shorter than 1e-3, yields zero.
pub fn estimate_torso_angles(
    left_shoulder: Option<Vec3>,
    right_shoulder: Option<Vec3>,
    left_hip: Option<Vec3>,
    right_hip: Option<Vec3>,
) -> JointAngles {
    let (Some(ls), Some(rs), Some(lh), Some(rh)) = (left_shoulder, right_shoulder, left_hip, right_hip)
    else {
        log::debug!("torso: missing shoulder or hip landmark");
        return JointAngles::ZERO;
    };

    torso_angles(ls, rs, lh, rh, MIN_SEGMENT_LENGTH).unwrap_or_else(|e| {
        log::debug!("torso: {}", e);
        JointAngles::ZERO
    })
}

pub(crate) fn torso_angles(ls: Vec3, rs: Vec3, lh: Vec3, rh: Vec3, min_length: f32) -> Result<JointAngles> {
    if ![ls, rs, lh, rh].iter().all(|p| p.is_finite()) {
        return Err(TrackerError::DegenerateGeometry("non-finite torso landmark"));
    }

    let shoulder_center = (ls + rs) / 2.0;
    let hip_center = (lh + rh) / 2.0;
    let shoulder_line = rs - ls;

    let spine_dir = unit_segment(shoulder_center - hip_center, min_length, "spine")?;
    unit_segment(shoulder_line, min_length, "shoulder line")?;

    let (pitch, yaw) = direction_pitch_yaw(spine_dir);
    let roll = line_roll(shoulder_line.truncate());

    Ok(JointAngles { pitch, yaw, roll })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;
    use wasm_bindgen_test::*;

    fn upright() -> [Option<Vec3>; 4] {
        [
            Some(Vec3::new(0.6, 0.3, 0.0)),
            Some(Vec3::new(0.4, 0.3, 0.0)),
            Some(Vec3::new(0.6, 0.7, 0.0)),
            Some(Vec3::new(0.4, 0.7, 0.0)),
        ]
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_upright_torso() {
        let [ls, rs, lh, rh] = upright();
        let torso = estimate_torso_angles(ls, rs, lh, rh);

        // Spine points up the image (-y)
        assert!((torso.pitch + FRAC_PI_2).abs() < 1e-5, "pitch {}", torso.pitch);
        // Shoulders level regardless of which side is on the left of the image
        assert_eq!(torso.roll, 0.0);
        assert!(torso.is_finite());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_tilted_shoulders_roll() {
        let [ls, _, lh, rh] = upright();
        let rs = Some(Vec3::new(0.4, 0.35, 0.0));
        let torso = estimate_torso_angles(ls, rs, lh, rh);
        assert!(torso.roll.abs() > 0.1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_missing_landmark_is_zero() {
        let [ls, rs, lh, _] = upright();
        assert_eq!(estimate_torso_angles(ls, rs, lh, None), JointAngles::ZERO);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_non_finite_landmark_is_zero() {
        let [ls, rs, lh, _] = upright();
        let rh = Some(Vec3::new(f32::INFINITY, 0.7, 0.0));
        assert_eq!(estimate_torso_angles(ls, rs, lh, rh), JointAngles::ZERO);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_collapsed_spine_is_zero() {
        let p = Vec3::new(0.5, 0.5, 0.0);
        let q = Vec3::new(0.5005, 0.5, 0.0);
        assert_eq!(estimate_torso_angles(Some(p), Some(q), Some(p), Some(q)), JointAngles::ZERO);
        assert!(matches!(
            torso_angles(p, q, p, q, MIN_SEGMENT_LENGTH),
            Err(TrackerError::DegenerateGeometry("spine"))
        ));
    }
}
