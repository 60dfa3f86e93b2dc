//! Avatar rig output
//!
//! Turns calibrated frames into local bone transforms for the renderer,
//! and binds logical bones to the nodes of a loaded avatar asset.

pub mod bone;
pub mod pose;

pub use bone::*;
pub use pose::*;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Per-axis gains from joint angles to bone Euler angles (x = pitch,
/// y = yaw, z = roll). A zero gain leaves that axis at rest.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RigMapping {
    pub head: Vec3,
    /// Shoulders are driven about Y only
    pub shoulder_yaw: f32,
    pub spine: Vec3,
    pub arms: Vec3,
    pub forearms: Vec3,
    /// Jaw rotation about X per unit of jaw opening
    pub jaw: f32,
    /// Eye Y scale while the eye is closed
    pub eye_closed_scale: f32,
    /// Image-to-scene axis flip for hand positions
    pub hand_axes: Vec3,
}

impl Default for RigMapping {
    fn default() -> Self {
        Self {
            head: Vec3::NEG_ONE,
            shoulder_yaw: 2.0,
            spine: Vec3::new(1.0, 0.0, -1.0),
            arms: Vec3::new(1.0, 0.0, 0.0),
            forearms: Vec3::ZERO,
            jaw: -1.0,
            eye_closed_scale: 0.2,
            hand_axes: Vec3::new(1.0, -1.0, -1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[test]
    #[wasm_bindgen_test]
    fn test_mapping_json_overrides_single_field() {
        let mapping: RigMapping = serde_json::from_str(r#"{ "forearms": [1.0, 1.0, 1.0] }"#).unwrap();
        assert_eq!(mapping.forearms, Vec3::ONE);
        assert_eq!(mapping.shoulder_yaw, 2.0);
    }
}
