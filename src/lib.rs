//! Avatar Pose Tracker - Wasm Core
//!
//! Turns webcam landmark detections into calibrated joint angles and avatar
//! bone rotations, from Rust via wasm-bindgen.

pub mod angles;
#[cfg(target_arch = "wasm32")]
pub mod api;
#[cfg(target_arch = "wasm32")]
mod bench;
pub mod calibration;
pub mod clock;
pub mod config;
pub mod error;
pub mod estimator;
pub mod frame;
pub mod landmark;
pub mod pipeline;
pub mod rig;
pub mod state;
mod tracker_constants;

use wasm_bindgen::prelude::*;

/// Lengths below this are treated as zero
pub const EPSILON: f32 = 1e-6;

#[cfg(target_arch = "wasm32")]
pub use bench::run_benchmarks;

// Re-exports for WASM API
#[cfg(target_arch = "wasm32")]
pub use api::{
    calibration_status, cancel_calibration, dropped_frames, init_tracker, init_tracker_json,
    on_calibration, on_joint, on_pose_frame, process_frame, resolve_bones, rig_rotations,
    set_bone_patterns, start_calibration, submit_detection, take_rig_update,
};

pub use angles::{BodyAngles, JointAngles, Sides};
pub use calibration::{
    calculate_offset, CalibrationEvent, CalibrationOffset, CalibrationPhase, CalibrationSample,
    CalibrationSession, CalibrationStatus,
};
pub use config::TrackerConfig;
pub use error::{CalibrationError, Result, TrackerError};
pub use estimator::{BodyEstimate, PoseEstimate, PoseEstimator};
pub use frame::{FrameInput, JointStream, JointUpdate, PoseFrame, PoseObserver, TrackedJoints};
pub use glam::Vec3;
pub use landmark::{Landmark, LandmarkSet};
pub use pipeline::{FramePipeline, FrameTicket};
pub use rig::{BoneBindings, RigBone, RigMapping, RigPose};

/// Log to browser console
#[wasm_bindgen]
pub fn log(msg: &str) {
    log::info!("{}", msg);
}

#[cfg(test)]
mod tests {
    use wasm_bindgen_test::*;
    wasm_bindgen_test_configure!(run_in_browser);
}
