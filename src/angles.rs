use crate::config::AxisSensitivity;
use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// Pitch/yaw/roll estimate of one joint, in radians.
///
/// Pitch is rotation about X (nodding), yaw about Y (turning),
/// roll about Z (tilting).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct JointAngles {
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub roll: f32,
}

impl JointAngles {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// True when no field is NaN or infinite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }

    /// Apply per-axis sensitivity multipliers
    pub fn scaled(self, sensitivity: &AxisSensitivity) -> Self {
        Self {
            pitch: self.pitch * sensitivity.pitch,
            yaw: self.yaw * sensitivity.yaw,
            roll: self.roll * sensitivity.roll,
        }
    }

    /// Multiply each axis by its own gain (x = pitch, y = yaw, z = roll)
    pub fn mul_axes(self, gains: Vec3) -> Self {
        Self {
            pitch: self.pitch * gains.x,
            yaw: self.yaw * gains.y,
            roll: self.roll * gains.z,
        }
    }

    /// Convert to quaternion (XYZ order)
    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.pitch, self.yaw, self.roll)
    }
}

impl Sub for JointAngles {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.pitch - rhs.pitch, self.yaw - rhs.yaw, self.roll - rhs.roll)
    }
}

/// A left/right pair of per-side values
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Sides<T> {
    pub left: T,
    pub right: T,
}

impl<T> Sides<T> {
    pub const fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Sides<U> {
        Sides {
            left: f(self.left),
            right: f(self.right),
        }
    }

    pub fn zip<U, R>(self, other: Sides<U>, mut f: impl FnMut(T, U) -> R) -> Sides<R> {
        Sides {
            left: f(self.left, other.left),
            right: f(self.right, other.right),
        }
    }
}

impl<T: Default> Sides<Option<T>> {
    /// Split into values, zero where a side is absent, and presence flags
    pub fn unzip_tracked(self) -> (Sides<T>, Sides<bool>) {
        let present = Sides::new(self.left.is_some(), self.right.is_some());
        (self.map(Option::unwrap_or_default), present)
    }
}

impl Sides<f32> {
    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.right.is_finite()
    }
}

impl Sides<JointAngles> {
    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.right.is_finite()
    }
}

/// A value for every body joint
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct BodyAngles {
    pub torso: JointAngles,
    pub shoulders: Sides<f32>,
    pub arms: Sides<JointAngles>,
    pub forearms: Sides<JointAngles>,
}

impl BodyAngles {
    pub const ZERO: Self = Self {
        torso: JointAngles::ZERO,
        shoulders: Sides::new(0.0, 0.0),
        arms: Sides::new(JointAngles::ZERO, JointAngles::ZERO),
        forearms: Sides::new(JointAngles::ZERO, JointAngles::ZERO),
    };

    pub fn is_finite(&self) -> bool {
        self.torso.is_finite() && self.shoulders.is_finite() && self.arms.is_finite() && self.forearms.is_finite()
    }
}
