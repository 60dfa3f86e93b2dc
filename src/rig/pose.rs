use super::bone::RigBone;
use super::RigMapping;
use crate::angles::{JointAngles, Sides};
use crate::frame::PoseFrame;
use glam::{Quat, Vec3};
use static_assertions::const_assert;

// One bit per bone in ChangeMask
const_assert!(RigBone::COUNT <= 16);

/// Bitset of bones whose transform changed since the last upload.
/// Bit i corresponds to the RigBone with index i.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeMask(u16);

impl ChangeMask {
    #[inline]
    pub fn with_marked(self, bone: RigBone) -> Self {
        Self(self.0 | (1 << bone.index()))
    }

    #[inline]
    pub fn contains(self, bone: RigBone) -> bool {
        self.0 & (1 << bone.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bones(self) -> impl Iterator<Item = RigBone> {
        RigBone::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

/// Local transforms for the driven avatar bones.
///
/// Updated through a functional API: each `with_*` call returns a new pose
/// and marks the touched bones in `changed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigPose {
    /// Local rotation for each bone (relative to its rest pose)
    pub local_rotations: [Quat; RigBone::COUNT],

    /// Vertical eye scale; shrinks to fake a blink
    pub eye_scales: Sides<f32>,

    /// Hand positions in scene space, when the wrists were tracked
    pub hand_positions: Option<Sides<Vec3>>,

    pub changed: ChangeMask,
}

impl Default for RigPose {
    fn default() -> Self {
        Self::rest_pose()
    }
}

impl RigPose {
    /// All rotations identity, eyes open
    pub fn rest_pose() -> Self {
        Self {
            local_rotations: [Quat::IDENTITY; RigBone::COUNT],
            eye_scales: Sides::new(1.0, 1.0),
            hand_positions: None,
            changed: ChangeMask::default(),
        }
    }

    /// Build a pose for one frame starting from rest
    pub fn from_frame(frame: &PoseFrame, mapping: &RigMapping) -> Self {
        Self::rest_pose().with_frame(frame, mapping)
    }

    pub fn rotation(&self, bone: RigBone) -> Quat {
        self.local_rotations[bone.index()]
    }

    /// Return a new pose with the specified bone rotation (Functional Set)
    pub fn with_rotation(self, bone: RigBone, rotation: Quat) -> Self {
        let mut new_pose = self;
        if new_pose.local_rotations[bone.index()] != rotation {
            new_pose.local_rotations[bone.index()] = rotation;
            new_pose.changed = new_pose.changed.with_marked(bone);
        }
        new_pose
    }

    pub fn with_eye_scales(self, scales: Sides<f32>) -> Self {
        let mut new_pose = self;
        if new_pose.eye_scales != scales {
            new_pose.eye_scales = scales;
            new_pose.changed = new_pose
                .changed
                .with_marked(RigBone::LeftEye)
                .with_marked(RigBone::RightEye);
        }
        new_pose
    }

    pub fn with_hand_positions(self, positions: Sides<Vec3>) -> Self {
        let mut new_pose = self;
        if new_pose.hand_positions != Some(positions) {
            new_pose.hand_positions = Some(positions);
            new_pose.changed = new_pose
                .changed
                .with_marked(RigBone::LeftHand)
                .with_marked(RigBone::RightHand);
        }
        new_pose
    }

    /// Clear the change mask after the renderer has consumed the pose
    pub fn with_changes_cleared(self) -> Self {
        Self {
            changed: ChangeMask::default(),
            ..self
        }
    }

    /// Apply a calibrated frame. Bones whose joint was not tracked this frame
    /// keep their previous transform.
    pub fn with_frame(self, frame: &PoseFrame, mapping: &RigMapping) -> Self {
        let tracked = &frame.tracked;
        let euler = |angles: JointAngles, gains: Vec3| angles.mul_axes(gains).to_quat();
        let paired = |pose: Self, bones: Sides<RigBone>, rotations: Sides<Quat>, on: Sides<bool>| {
            [(bones.left, rotations.left, on.left), (bones.right, rotations.right, on.right)]
                .into_iter()
                .filter(|(_, _, on)| *on)
                .fold(pose, |pose, (bone, rotation, _)| pose.with_rotation(bone, rotation))
        };

        let mut pose = self;

        if tracked.head {
            pose = pose.with_rotation(RigBone::Head, euler(frame.head, mapping.head));
        }
        if tracked.torso {
            pose = pose.with_rotation(RigBone::Spine, euler(frame.torso, mapping.spine));
        }

        pose = paired(
            pose,
            Sides::new(RigBone::LeftShoulder, RigBone::RightShoulder),
            frame.shoulders.map(|a| Quat::from_rotation_y(a * mapping.shoulder_yaw)),
            tracked.shoulders,
        );
        pose = paired(
            pose,
            Sides::new(RigBone::LeftUpperArm, RigBone::RightUpperArm),
            frame.arms.map(|a| euler(a, mapping.arms)),
            tracked.arms,
        );
        pose = paired(
            pose,
            Sides::new(RigBone::LeftForearm, RigBone::RightForearm),
            frame.forearms.map(|a| euler(a, mapping.forearms)),
            tracked.forearms,
        );

        if let Some(face) = &frame.face {
            let jaw = Quat::from_rotation_x(face.jaw_open * mapping.jaw);
            let scale = |closed: bool| {
                if closed {
                    mapping.eye_closed_scale
                } else {
                    1.0
                }
            };
            pose = pose
                .with_rotation(RigBone::Jaw, jaw)
                .with_eye_scales(face.eye_closed.map(scale));
        }

        if let Some(wrists) = frame.wrists {
            pose = pose.with_hand_positions(wrists.map(|w| w * mapping.hand_axes));
        }

        pose
    }

    /// Rotations as a flat [x, y, z, w] buffer in `RigBone` order
    pub fn rotation_buffer(&self) -> &[f32] {
        bytemuck::cast_slice(&self.local_rotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::FaceExpression;
    use crate::frame::TrackedJoints;
    use glam::EulerRot;
    use wasm_bindgen_test::*;

    fn tracked_frame() -> PoseFrame {
        let both = Sides::new(true, true);
        PoseFrame {
            head: JointAngles::new(0.1, 0.2, 0.3),
            torso: JointAngles::new(0.3, 0.0, 0.2),
            shoulders: Sides::new(0.25, -0.25),
            arms: Sides::new(JointAngles::new(0.4, 0.0, 0.0), JointAngles::ZERO),
            tracked: TrackedJoints {
                head: true,
                torso: true,
                shoulders: both,
                arms: both,
                forearms: both,
            },
            ..Default::default()
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_head_rotation_is_negated() {
        let pose = RigPose::from_frame(&tracked_frame(), &RigMapping::default());
        let expected = Quat::from_euler(EulerRot::XYZ, -0.1, -0.2, -0.3);
        assert!(pose.rotation(RigBone::Head).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_shoulder_yaw_is_doubled() {
        let pose = RigPose::from_frame(&tracked_frame(), &RigMapping::default());
        let expected = Quat::from_rotation_y(0.5);
        assert!(pose.rotation(RigBone::LeftShoulder).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_forearms_off_by_default() {
        let mut frame = tracked_frame();
        frame.forearms = Sides::new(JointAngles::new(0.5, 0.5, 0.5), JointAngles::ZERO);
        let pose = RigPose::from_frame(&frame, &RigMapping::default());
        assert_eq!(pose.rotation(RigBone::LeftForearm), Quat::IDENTITY);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_untracked_body_keeps_previous_rotation() {
        let mapping = RigMapping::default();
        let pose = RigPose::from_frame(&tracked_frame(), &mapping).with_changes_cleared();
        let arm = pose.rotation(RigBone::LeftUpperArm);

        let head_only = PoseFrame {
            tracked: TrackedJoints {
                head: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let pose = pose.with_frame(&head_only, &mapping);
        assert_eq!(pose.rotation(RigBone::LeftUpperArm), arm);
        assert!(pose.changed.contains(RigBone::Head));
        assert!(!pose.changed.contains(RigBone::LeftUpperArm));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_lost_joint_keeps_its_bone() {
        let mapping = RigMapping::default();
        let pose = RigPose::from_frame(&tracked_frame(), &mapping).with_changes_cleared();
        let spine = pose.rotation(RigBone::Spine);
        assert_ne!(spine, Quat::IDENTITY);

        // Torso and the right arm lost, everything else still tracked
        let mut frame = tracked_frame();
        frame.torso = JointAngles::ZERO;
        frame.arms.left = JointAngles::new(0.1, 0.0, 0.0);
        frame.arms.right = JointAngles::ZERO;
        frame.tracked.torso = false;
        frame.tracked.arms.right = false;
        let right_arm = pose.rotation(RigBone::RightUpperArm);

        let pose = pose.with_frame(&frame, &mapping);
        assert_eq!(pose.rotation(RigBone::Spine), spine);
        assert_eq!(pose.rotation(RigBone::RightUpperArm), right_arm);
        assert!(!pose.changed.contains(RigBone::Spine));
        assert!(pose.changed.contains(RigBone::LeftUpperArm));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_blink_and_jaw() {
        let frame = PoseFrame {
            face: Some(FaceExpression {
                jaw_open: 0.6,
                eye_closed: Sides::new(true, false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let pose = RigPose::from_frame(&frame, &RigMapping::default());

        assert_eq!(pose.eye_scales, Sides::new(0.2, 1.0));
        assert!(pose.rotation(RigBone::Jaw).abs_diff_eq(Quat::from_rotation_x(-0.6), 1e-6));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_wrists_flip_y_and_z() {
        let frame = PoseFrame {
            wrists: Some(Sides::new(Vec3::new(0.3, 0.5, 0.1), Vec3::new(0.7, 0.5, -0.1))),
            ..Default::default()
        };
        let pose = RigPose::from_frame(&frame, &RigMapping::default());
        let hands = pose.hand_positions.unwrap();
        assert_eq!(hands.left, Vec3::new(0.3, -0.5, -0.1));
        assert_eq!(hands.right, Vec3::new(0.7, -0.5, 0.1));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_rotation_buffer_layout() {
        let pose = RigPose::rest_pose().with_rotation(RigBone::Spine, Quat::from_rotation_z(1.0));
        let buffer = pose.rotation_buffer();

        assert_eq!(buffer.len(), RigBone::COUNT * 4);
        let spine = RigBone::Spine.index() * 4;
        let q = pose.rotation(RigBone::Spine);
        assert_eq!(&buffer[spine..spine + 4], &[q.x, q.y, q.z, q.w]);
        // Head untouched: identity
        assert_eq!(&buffer[0..4], &[0.0, 0.0, 0.0, 1.0]);
    }
}
