use crate::angles::JointAngles;
use crate::error::{Result, TrackerError};
use crate::tracker_constants::MIN_SEGMENT_LENGTH;
use crate::EPSILON;
use glam::{Vec2, Vec3};

/// "Straight up" from the shoulder in image coordinates (y grows downward)
const UP: Vec2 = Vec2::new(0.0, -1.0);

/// Angle between the upper arm and straight up, in radians.
///
/// Works in the image plane only. The sign comes from the 2D cross product
/// of the arm vector with the up reference: an arm swung toward +x reads
/// negative, toward -x positive. An arm hanging straight down has a zero
/// cross product and is reported as +PI.
pub fn estimate_shoulder_angle(shoulder: Vec2, elbow: Vec2) -> f32 {
    shoulder_angle(shoulder, elbow).unwrap_or_else(|e| {
        log::debug!("shoulder angle: {}", e);
        0.0
    })
}

pub(crate) fn shoulder_angle(shoulder: Vec2, elbow: Vec2) -> Result<f32> {
    let arm = elbow - shoulder;
    let len = arm.length();
    if !len.is_finite() || len < EPSILON {
        return Err(TrackerError::DegenerateGeometry("zero-length upper arm"));
    }

    let cos = (arm.dot(UP) / len).clamp(-1.0, 1.0);
    let angle = cos.acos();
    let cross = arm.perp_dot(UP);

    Ok(if cross < 0.0 { -angle } else { angle })
}

/// Unit vector along `v`, or DegenerateGeometry if shorter than `min_length`
pub(crate) fn unit_segment(v: Vec3, min_length: f32, what: &'static str) -> Result<Vec3> {
    let len = v.length();
    if len.is_finite() && len >= min_length {
        Ok(v / len)
    } else {
        Err(TrackerError::DegenerateGeometry(what))
    }
}

/// Pitch and yaw of a unit direction: pitch = asin(y), yaw = atan2(x, z)
pub(crate) fn direction_pitch_yaw(dir: Vec3) -> (f32, f32) {
    let pitch = dir.y.clamp(-1.0, 1.0).asin();
    let yaw = dir.x.atan2(dir.z);
    (pitch, yaw)
}

/// Rotation of the segment proximal -> distal.
///
/// Pitch and yaw come from the normalized segment direction. Roll is the
/// image-plane angle of the next segment down the chain (distal ->
/// reference), `atan2(x, y)`, so it reads zero when that segment hangs
/// straight down. The upper arm passes the wrist as reference, the forearm
/// the index knuckle.
pub fn estimate_limb_rotation(proximal: Vec3, distal: Vec3, reference: Vec3) -> JointAngles {
    limb_rotation(proximal, distal, reference, MIN_SEGMENT_LENGTH).unwrap_or_else(|e| {
        log::debug!("limb rotation: {}", e);
        JointAngles::ZERO
    })
}

/// Like `estimate_limb_rotation`, but a degenerate primary segment is an error
pub(crate) fn limb_rotation(proximal: Vec3, distal: Vec3, reference: Vec3, min_length: f32) -> Result<JointAngles> {
    let dir = unit_segment(distal - proximal, min_length, "limb segment")?;
    let (pitch, yaw) = direction_pitch_yaw(dir);

    let secondary = (reference - distal).truncate();
    let roll = if secondary.is_finite() && secondary.length() >= min_length {
        secondary.x.atan2(secondary.y)
    } else {
        0.0
    };

    Ok(JointAngles { pitch, yaw, roll })
}
