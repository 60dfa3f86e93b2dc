//! Browser bindings
//!
//! Thin wrappers that pull the tracker out of the thread-local state and
//! call into the core. JavaScript callbacks are kept here, outside the
//! tracker, and invoked only after the state borrow is released so a
//! callback may call back into this API.

use crate::calibration::CalibrationPhase;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::frame::{FrameInput, JointStream, PoseFrame};
use crate::rig::{BonePatterns, RigPose};
use crate::state::{initialize_tracker_state, with_tracker_state, with_tracker_state_mut};
use js_sys::Function;
use serde::Serialize;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[derive(Default)]
struct JsCallbacks {
    frames: Vec<Function>,
    joints: Vec<(JointStream, Function)>,
    calibration: Vec<Function>,
}

thread_local! {
    static CALLBACKS: RefCell<JsCallbacks> = RefCell::new(JsCallbacks::default());
}

fn not_initialized() -> JsValue {
    JsValue::from_str("tracker not initialized; call init_tracker first")
}

fn to_js_error(err: TrackerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

fn call_each(functions: &[Function], value: &JsValue) {
    for f in functions {
        if let Err(e) = f.call1(&JsValue::NULL, value) {
            log::warn!("callback threw: {:?}", e);
        }
    }
}

/// Install the panic hook and logger, then replace any previous tracker
fn start_tracker(config: TrackerConfig) {
    // Set up panic hook for better error messages in browser console
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();

    initialize_tracker_state(config);
    CALLBACKS.with(|c| *c.borrow_mut() = JsCallbacks::default());
    log::info!("Tracker initialized");
}

/// Initialize the tracker. `config` may be undefined for defaults, or a
/// (partial) config object.
#[wasm_bindgen]
pub fn init_tracker(config: JsValue) -> Result<(), JsValue> {
    let config: TrackerConfig = if config.is_undefined() || config.is_null() {
        TrackerConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };
    config.validate().map_err(to_js_error)?;
    start_tracker(config);
    Ok(())
}

/// Same as `init_tracker`, from a JSON preset
#[wasm_bindgen]
pub fn init_tracker_json(json: &str) -> Result<(), JsValue> {
    let config = TrackerConfig::from_json(json).map_err(to_js_error)?;
    start_tracker(config);
    Ok(())
}

fn phase_and_calibrated() -> Option<(CalibrationPhase, bool)> {
    with_tracker_state(|s| {
        let session = s.pipeline.session();
        (session.phase(), session.is_calibrated())
    })
}

/// Notify calibration callbacks if the session changed since `before`
fn report_calibration_change(before: Option<(CalibrationPhase, bool)>) {
    let after = phase_and_calibrated();
    let changed = match (before, after) {
        (Some((p0, c0)), Some((p1, c1))) => {
            std::mem::discriminant(&p0) != std::mem::discriminant(&p1) || c0 != c1
        }
        _ => false,
    };
    if !changed {
        return;
    }

    let now = crate::clock::now_ms();
    let Some(Ok(status)) = with_tracker_state(|s| to_js(&s.pipeline.calibration_status(now))) else {
        return;
    };
    CALLBACKS.with(|c| call_each(&c.borrow().calibration, &status));
}

fn dispatch_frame(frame: &PoseFrame) -> Result<JsValue, JsValue> {
    let value = to_js(frame)?;
    CALLBACKS.with(|c| -> Result<(), JsValue> {
        let callbacks = c.borrow();
        call_each(&callbacks.frames, &value);
        for (stream, f) in &callbacks.joints {
            if let Some(update) = frame.joint(*stream) {
                if let Err(e) = f.call1(&JsValue::NULL, &to_js(&update)?) {
                    log::warn!("{} callback threw: {:?}", stream.name(), e);
                }
            }
        }
        Ok(())
    })?;
    Ok(value)
}

#[wasm_bindgen]
pub fn start_calibration() -> Result<(), JsValue> {
    let before = phase_and_calibrated();
    with_tracker_state_mut(|s| s.pipeline.start_calibration(crate::clock::now_ms()))
        .ok_or_else(not_initialized)?;
    report_calibration_change(before);
    Ok(())
}

#[wasm_bindgen]
pub fn cancel_calibration() -> Result<(), JsValue> {
    let before = phase_and_calibrated();
    with_tracker_state_mut(|s| s.pipeline.cancel_calibration(crate::clock::now_ms()))
        .ok_or_else(not_initialized)?;
    report_calibration_change(before);
    Ok(())
}

/// Current `CalibrationStatus` as a plain object
#[wasm_bindgen]
pub fn calibration_status() -> Result<JsValue, JsValue> {
    let now = crate::clock::now_ms();
    with_tracker_state(|s| to_js(&s.pipeline.calibration_status(now))).ok_or_else(not_initialized)?
}

fn frame_input(value: JsValue) -> Result<FrameInput, JsValue> {
    let mut input: FrameInput = serde_wasm_bindgen::from_value(value)?;
    if input.timestamp_ms == 0.0 {
        input.timestamp_ms = crate::clock::now_ms();
    }
    Ok(input)
}

/// Feed detector output that is already available.
///
/// Returns the calibrated frame, or null while calibrating or before the
/// first calibration. A missing or zero `timestampMs` is stamped with
/// `performance.now()`. This call does not wait for or claim the detector
/// slot used by `submit_detection`.
#[wasm_bindgen]
pub fn process_frame(input: JsValue) -> Result<JsValue, JsValue> {
    let input = frame_input(input)?;
    let before = phase_and_calibrated();
    let frame = with_tracker_state_mut(|s| s.handle_frame(&input)).ok_or_else(not_initialized)?;
    report_calibration_change(before);

    match frame {
        Some(frame) => dispatch_frame(&frame),
        None => Ok(JsValue::NULL),
    }
}

/// Await a detector promise for the current camera frame.
///
/// Frames submitted while a previous detection is pending are dropped and
/// resolve to null without awaiting their promise. A detection still
/// pending after `detection_timeout_ms` is abandoned and the next frame
/// takes its place. A rejected promise is logged and the frame skipped.
#[wasm_bindgen]
pub async fn submit_detection(detection: js_sys::Promise) -> Result<JsValue, JsValue> {
    let now = crate::clock::now_ms();
    let ticket = with_tracker_state_mut(|s| s.pipeline.begin_frame(now)).ok_or_else(not_initialized)?;
    let Some(ticket) = ticket else {
        return Ok(JsValue::NULL);
    };

    let result = match JsFuture::from(detection).await {
        Ok(value) => frame_input(value).map_err(|e| TrackerError::Detector(format!("{:?}", e))),
        Err(e) => Err(TrackerError::Detector(format!("{:?}", e))),
    };

    let before = phase_and_calibrated();
    let frame = with_tracker_state_mut(|s| s.complete_frame(ticket, result)).ok_or_else(not_initialized)?;
    report_calibration_change(before);

    match frame {
        Some(frame) => dispatch_frame(&frame),
        None => Ok(JsValue::NULL),
    }
}

/// Register a callback receiving every calibrated `PoseFrame`
#[wasm_bindgen]
pub fn on_pose_frame(callback: Function) {
    CALLBACKS.with(|c| c.borrow_mut().frames.push(callback));
}

/// Register a callback for one joint ("head", "torso", "shoulders", "arms",
/// "forearms", "face" or "wrists")
#[wasm_bindgen]
pub fn on_joint(stream: &str, callback: Function) -> Result<(), JsValue> {
    let stream = JointStream::from_name(stream)
        .ok_or_else(|| JsValue::from_str(&format!("unknown joint stream '{}'", stream)))?;
    CALLBACKS.with(|c| c.borrow_mut().joints.push((stream, callback)));
    Ok(())
}

/// Register a callback receiving `CalibrationStatus` on every phase change
#[wasm_bindgen]
pub fn on_calibration(callback: Function) {
    CALLBACKS.with(|c| c.borrow_mut().calibration.push(callback));
}

/// Override the node name fragments used by `resolve_bones`
#[wasm_bindgen]
pub fn set_bone_patterns(patterns: JsValue) -> Result<(), JsValue> {
    let patterns: BonePatterns = serde_wasm_bindgen::from_value(patterns)?;
    with_tracker_state_mut(|s| s.bone_patterns = patterns).ok_or_else(not_initialized)
}

/// Bind rig bones to the loaded avatar's node names.
/// Returns one node index per bone in rig order, -1 where unbound.
#[wasm_bindgen]
pub fn resolve_bones(node_names: Vec<String>) -> Result<Vec<i32>, JsValue> {
    with_tracker_state_mut(|s| s.load_avatar(&node_names).to_node_indices()).ok_or_else(not_initialized)
}

/// Bone rotations as [x, y, z, w] per bone, in rig order
#[wasm_bindgen]
pub fn rig_rotations() -> Vec<f32> {
    with_tracker_state(|s| s.rig_pose.rotation_buffer().to_vec()).unwrap_or_default()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RigUpdate {
    rotations: Vec<f32>,
    eye_scales: crate::angles::Sides<f32>,
    hand_positions: Option<crate::angles::Sides<glam::Vec3>>,
    changed: Vec<usize>,
}

impl From<&RigPose> for RigUpdate {
    fn from(pose: &RigPose) -> Self {
        Self {
            rotations: pose.rotation_buffer().to_vec(),
            eye_scales: pose.eye_scales,
            hand_positions: pose.hand_positions,
            changed: pose.changed.bones().map(|b| b.index()).collect(),
        }
    }
}

/// Everything the renderer needs for this frame; clears the change mask
#[wasm_bindgen]
pub fn take_rig_update() -> Result<JsValue, JsValue> {
    let update = with_tracker_state_mut(|s| {
        let update = RigUpdate::from(&s.rig_pose);
        s.rig_pose = s.rig_pose.with_changes_cleared();
        update
    })
    .ok_or_else(not_initialized)?;
    to_js(&update)
}

/// Camera frames dropped because the detector was busy
#[wasm_bindgen]
pub fn dropped_frames() -> u32 {
    with_tracker_state(|s| s.pipeline.dropped_frames() as u32).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    fn registered_frame_callbacks() -> usize {
        CALLBACKS.with(|c| c.borrow().frames.len())
    }

    #[wasm_bindgen_test]
    fn test_both_init_paths_start_a_fresh_tracker() {
        on_pose_frame(Function::new_no_args(""));
        init_tracker_json(r#"{ "calibration": { "duration_ms": 5000 } }"#).unwrap();
        assert_eq!(registered_frame_callbacks(), 0);
        assert_eq!(with_tracker_state(|s| s.config.calibration.duration_ms), Some(5000.0));

        on_pose_frame(Function::new_no_args(""));
        init_tracker(JsValue::UNDEFINED).unwrap();
        assert_eq!(registered_frame_callbacks(), 0);
        assert_eq!(with_tracker_state(|s| s.config.calibration.duration_ms), Some(3000.0));
    }

    #[wasm_bindgen_test]
    fn test_frame_without_timestamp_is_stamped() {
        let value = js_sys::JSON::parse(r#"{ "faceLandmarks": [] }"#).unwrap();
        let input = frame_input(value).unwrap();
        assert!(input.timestamp_ms > 0.0);
        assert!(input.face_landmarks.unwrap().is_empty());
    }
}
