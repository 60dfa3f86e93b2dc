//! Centralized tracker state with context passing pattern
//!
//! `TrackerState` bundles everything one page needs: the frame pipeline,
//! the rig pose it drives and the bone bindings for the loaded avatar.
//! Core types take explicit references; only the wasm bindings reach the
//! thread-local instance below.

use std::cell::RefCell;

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::frame::{FrameInput, PoseFrame};
use crate::pipeline::{FramePipeline, FrameTicket};
use crate::rig::{BoneBindings, BonePatterns, RigMapping, RigPose};

pub struct TrackerState {
    pub config: TrackerConfig,
    pub pipeline: FramePipeline,
    pub rig_mapping: RigMapping,
    /// Latest bone transforms for the renderer
    pub rig_pose: RigPose,
    /// Resolved once per loaded avatar
    pub bindings: Option<BoneBindings>,
    pub bone_patterns: BonePatterns,
}

impl TrackerState {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            pipeline: FramePipeline::new(&config),
            rig_mapping: config.rig,
            rig_pose: RigPose::rest_pose(),
            bindings: None,
            bone_patterns: BonePatterns::default(),
        }
    }

    /// Process one frame and fold the result into the rig pose
    pub fn handle_frame(&mut self, input: &FrameInput) -> Option<PoseFrame> {
        let frame = self.pipeline.process_frame(input)?;
        self.rig_pose = self.rig_pose.with_frame(&frame, &self.rig_mapping);
        Some(frame)
    }

    /// Finish an asynchronous detection started with `begin_frame`
    pub fn complete_frame(
        &mut self,
        ticket: FrameTicket,
        result: Result<FrameInput, TrackerError>,
    ) -> Option<PoseFrame> {
        let frame = self.pipeline.complete_frame(ticket, result)?;
        self.rig_pose = self.rig_pose.with_frame(&frame, &self.rig_mapping);
        Some(frame)
    }

    /// Bind rig bones to the nodes of a newly loaded avatar
    pub fn load_avatar<S: AsRef<str>>(&mut self, node_names: &[S]) -> &BoneBindings {
        let bindings = BoneBindings::resolve(node_names, &self.bone_patterns);
        self.rig_pose = RigPose::rest_pose();
        self.bindings.insert(bindings)
    }
}

// Global state access, thin wrapper for WASM bindings only
thread_local! {
    static TRACKER_STATE: RefCell<Option<TrackerState>> = const { RefCell::new(None) };
}

/// Execute a closure with immutable access to TrackerState
///
/// Returns None if TrackerState is not initialized
pub fn with_tracker_state<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&TrackerState) -> R,
{
    TRACKER_STATE.with(|state| {
        let borrowed = state.borrow();
        borrowed.as_ref().map(f)
    })
}

/// Execute a closure with mutable access to TrackerState
///
/// Returns None if TrackerState is not initialized
pub fn with_tracker_state_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut TrackerState) -> R,
{
    TRACKER_STATE.with(|state| {
        let mut borrowed = state.borrow_mut();
        borrowed.as_mut().map(f)
    })
}

/// Replace the global TrackerState
///
/// Called by init_tracker(); re-initializing drops observers and calibration
pub fn initialize_tracker_state(config: TrackerConfig) {
    TRACKER_STATE.with(|state| {
        *state.borrow_mut() = Some(TrackerState::new(config));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::tests::full_input;
    use crate::rig::RigBone;
    use wasm_bindgen_test::*;

    #[test]
    #[wasm_bindgen_test]
    fn test_uninitialized_state_is_none() {
        TRACKER_STATE.with(|s| *s.borrow_mut() = None);
        assert!(with_tracker_state(|_| ()).is_none());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_calibrated_frames_update_rig_pose() {
        let mut state = TrackerState::new(TrackerConfig::default());
        state.pipeline.start_calibration(0.0);

        let mut t = 0.0;
        while t <= 3000.0 {
            state.handle_frame(&full_input(t));
            t += 100.0;
        }
        assert!(state.rig_pose.changed.is_empty());

        // Tilt the head after calibration
        let mut input = full_input(3100.0);
        input.face_landmarks = Some(crate::estimator::head::tests::face_with(
            (0.5, 0.25),
            (0.47, 0.18),
            (0.53, 0.18),
        ));
        let frame = state.handle_frame(&input).unwrap();
        assert!(frame.head.pitch != 0.0);
        assert!(state.rig_pose.changed.contains(RigBone::Head));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_global_state_round_trip() {
        initialize_tracker_state(TrackerConfig::default());
        let bound = with_tracker_state_mut(|s| {
            s.load_avatar(&["Head_3", "Jaw"]).node(RigBone::Jaw)
        });
        assert_eq!(bound, Some(Some(1)));
        assert!(with_tracker_state(|s| s.bindings.is_some()).unwrap());
    }
}
