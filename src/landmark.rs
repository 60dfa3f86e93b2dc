//! Detector landmarks
//!
//! Landmarks arrive from the external detectors as normalized points:
//! x and y in [0, 1] relative to the frame, z as relative depth.
//! They are read-only inputs; nothing in the crate mutates them.

use crate::error::{Result, TrackerError};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

/// Number of points in a refined face mesh
pub const FACE_MESH_LANDMARK_COUNT: usize = 478;

/// Number of points in a full body pose result
pub const POSE_LANDMARK_COUNT: usize = 33;

/// Face mesh indices used by the head and expression estimators
pub mod face {
    pub const NOSE: usize = 1;
    pub const LEFT_EYE: usize = 33;
    pub const RIGHT_EYE: usize = 263;
    pub const LEFT_EAR: usize = 234;
    pub const RIGHT_EAR: usize = 454;
    pub const LEFT_MOUTH: usize = 61;
    pub const RIGHT_MOUTH: usize = 291;

    pub const UPPER_INNER_LIP: usize = 13;
    pub const LOWER_INNER_LIP: usize = 14;
    pub const LEFT_EYE_UPPER_LID: usize = 159;
    pub const LEFT_EYE_LOWER_LID: usize = 145;
    pub const RIGHT_EYE_UPPER_LID: usize = 386;
    pub const RIGHT_EYE_LOWER_LID: usize = 374;
}

/// Body pose indices used by the torso and limb estimators
pub mod pose {
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_INDEX: usize = 19;
    pub const RIGHT_INDEX: usize = 20;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
}

const_assert!(face::RIGHT_EAR < FACE_MESH_LANDMARK_COUNT);
const_assert!(face::RIGHT_EYE_UPPER_LID < FACE_MESH_LANDMARK_COUNT);
const_assert!(pose::RIGHT_HIP < POSE_LANDMARK_COUNT);

/// A single detector landmark
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// Detector confidence that the point is visible (pose results only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec3> for Landmark {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// One detector result: landmarks in detector index order
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Landmark at a detector index.
    ///
    /// Returns None for an index past the end or for a non-finite point,
    /// so callers treat both as a missing landmark.
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index).filter(|lm| lm.is_finite())
    }

    /// Like `get`, but a missing landmark is an error
    pub fn require(&self, index: usize) -> Result<&Landmark> {
        self.get(index)
            .ok_or(TrackerError::MissingLandmark { index })
    }

    /// Landmark position as a vector
    pub fn point(&self, index: usize) -> Option<Vec3> {
        self.get(index).map(|lm| lm.to_vec3())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Overwrite one landmark, growing the set with zeros if needed
    pub fn with_landmark(mut self, index: usize, landmark: Landmark) -> Self {
        if self.points.len() <= index {
            self.points.resize(index + 1, Landmark::default());
        }
        self.points[index] = landmark;
        self
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(points: Vec<Landmark>) -> Self {
        Self::new(points)
    }
}

/// One blendshape score from the face landmarker
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendshapeCategory {
    pub category_name: String,
    pub score: f32,
}

/// Look up a blendshape score by case-insensitive name fragment
pub fn blendshape_score(categories: &[BlendshapeCategory], fragment: &str) -> Option<f32> {
    let fragment = fragment.to_lowercase();
    categories
        .iter()
        .find(|c| c.category_name.to_lowercase().contains(&fragment))
        .map(|c| c.score)
}
