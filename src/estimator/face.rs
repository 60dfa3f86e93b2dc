use crate::angles::Sides;
use crate::landmark::{blendshape_score, face, BlendshapeCategory, LandmarkSet};
use crate::tracker_constants::*;
use serde::{Deserialize, Serialize};

/// Facial animation data forwarded with each frame.
///
/// Not calibrated: the values already read zero for a neutral face.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct FaceExpression {
    /// Jaw opening in [0, JAW_OPEN_MAX]
    pub jaw_open: f32,
    /// Raw inner-lip gap (normalized units)
    pub mouth_open: f32,
    /// Raw lid gap per eye (normalized units)
    pub eye_open: Sides<f32>,
    pub eye_closed: Sides<bool>,
    /// True when jaw and blink come from detector blendshapes
    pub from_blendshapes: bool,
}

fn vertical_gap(landmarks: &LandmarkSet, upper: usize, lower: usize) -> Option<f32> {
    let upper = landmarks.get(upper)?;
    let lower = landmarks.get(lower)?;
    Some((upper.y - lower.y).abs())
}

fn jaw_from_mouth_gap(mouth_open: f32) -> f32 {
    ((mouth_open - MOUTH_OPEN_THRESHOLD) * MOUTH_OPEN_GAIN).clamp(0.0, JAW_OPEN_MAX)
}

/// Jaw and eye state for the avatar's face.
///
/// Blendshape scores win when the detector provides them (`jawOpen`,
/// `eyeBlinkLeft`, `eyeBlinkRight`, matched case-insensitively). Without
/// blendshapes the inner-lip and eyelid gaps are thresholded instead.
/// Returns None if neither source is available.
pub fn estimate_face_expression(
    landmarks: Option<&LandmarkSet>,
    blendshapes: Option<&[BlendshapeCategory]>,
) -> Option<FaceExpression> {
    let gaps = landmarks.map(|lm| {
        (
            vertical_gap(lm, face::UPPER_INNER_LIP, face::LOWER_INNER_LIP),
            vertical_gap(lm, face::LEFT_EYE_UPPER_LID, face::LEFT_EYE_LOWER_LID),
            vertical_gap(lm, face::RIGHT_EYE_UPPER_LID, face::RIGHT_EYE_LOWER_LID),
        )
    });
    let (mouth, left_eye, right_eye) = gaps.unwrap_or((None, None, None));
    let blendshapes = blendshapes.filter(|b| !b.is_empty());

    match blendshapes {
        Some(categories) => {
            let jaw_open = match blendshape_score(categories, "jawOpen") {
                Some(score) => (score * JAW_BLENDSHAPE_GAIN).min(JAW_OPEN_MAX),
                None => jaw_from_mouth_gap(mouth.unwrap_or(0.0)),
            };
            let closed = |name: &str| {
                blendshape_score(categories, name).is_some_and(|s| s > BLINK_SCORE_THRESHOLD)
            };

            Some(FaceExpression {
                jaw_open,
                mouth_open: mouth.unwrap_or(0.0),
                eye_open: Sides::new(left_eye.unwrap_or(0.0), right_eye.unwrap_or(0.0)),
                eye_closed: Sides::new(closed("eyeBlinkLeft"), closed("eyeBlinkRight")),
                from_blendshapes: true,
            })
        }
        None => {
            let (mouth, left_eye, right_eye) = (mouth?, left_eye?, right_eye?);
            Some(FaceExpression {
                jaw_open: jaw_from_mouth_gap(mouth),
                mouth_open: mouth,
                eye_open: Sides::new(left_eye, right_eye),
                eye_closed: Sides::new(left_eye < EYE_OPEN_THRESHOLD, right_eye < EYE_OPEN_THRESHOLD),
                from_blendshapes: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;
    use wasm_bindgen_test::*;

    fn face_with_gaps(mouth: f32, left_eye: f32, right_eye: f32) -> LandmarkSet {
        LandmarkSet::default()
            .with_landmark(face::UPPER_INNER_LIP, Landmark::new(0.5, 0.6, 0.0))
            .with_landmark(face::LOWER_INNER_LIP, Landmark::new(0.5, 0.6 + mouth, 0.0))
            .with_landmark(face::LEFT_EYE_UPPER_LID, Landmark::new(0.45, 0.4, 0.0))
            .with_landmark(face::LEFT_EYE_LOWER_LID, Landmark::new(0.45, 0.4 + left_eye, 0.0))
            .with_landmark(face::RIGHT_EYE_UPPER_LID, Landmark::new(0.55, 0.4, 0.0))
            .with_landmark(face::RIGHT_EYE_LOWER_LID, Landmark::new(0.55, 0.4 + right_eye, 0.0))
    }

    fn category(name: &str, score: f32) -> BlendshapeCategory {
        BlendshapeCategory {
            category_name: name.to_string(),
            score,
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_closed_mouth_open_eyes_from_landmarks() {
        let face = face_with_gaps(0.005, 0.01, 0.01);
        let expr = estimate_face_expression(Some(&face), None).unwrap();

        assert_eq!(expr.jaw_open, 0.0);
        assert_eq!(expr.eye_closed, Sides::new(false, false));
        assert!(!expr.from_blendshapes);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_wide_mouth_caps_jaw() {
        let face = face_with_gaps(0.3, 0.01, 0.01);
        let expr = estimate_face_expression(Some(&face), None).unwrap();
        assert_eq!(expr.jaw_open, JAW_OPEN_MAX);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_blink_from_lid_gap() {
        let face = face_with_gaps(0.0, 0.001, 0.01);
        let expr = estimate_face_expression(Some(&face), None).unwrap();
        assert_eq!(expr.eye_closed, Sides::new(true, false));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_blendshapes_take_priority() {
        let face = face_with_gaps(0.3, 0.001, 0.001);
        let shapes = vec![
            category("jawOpen", 0.5),
            category("eyeBlinkLeft", 0.2),
            category("eyeBlinkRight", 0.9),
        ];
        let expr = estimate_face_expression(Some(&face), Some(&shapes)).unwrap();

        assert!((expr.jaw_open - 0.6).abs() < 1e-6);
        assert_eq!(expr.eye_closed, Sides::new(false, true));
        assert!(expr.from_blendshapes);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_missing_jaw_blendshape_falls_back_to_mouth() {
        let face = face_with_gaps(0.06, 0.01, 0.01);
        let shapes = vec![category("eyeBlinkLeft", 0.9)];
        let expr = estimate_face_expression(Some(&face), Some(&shapes)).unwrap();
        assert!((expr.jaw_open - 0.6).abs() < 1e-4, "jaw {}", expr.jaw_open);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_nothing_available_is_none() {
        assert!(estimate_face_expression(None, None).is_none());
        assert!(estimate_face_expression(Some(&LandmarkSet::default()), Some(&[])).is_none());
    }
}
