use crate::calibration::calculate_offset;
use crate::calibration::CalibrationSample;
use crate::estimator::PoseEstimator;
use crate::frame::FrameInput;
use crate::landmark::{Landmark, LandmarkSet, FACE_MESH_LANDMARK_COUNT, POSE_LANDMARK_COUNT};
use crate::pipeline::FramePipeline;
use crate::rig::{RigMapping, RigPose};
use wasm_bindgen::prelude::*;

#[derive(serde::Serialize)]
pub struct BenchmarkResults {
    pub iterations: i32,
    pub estimate_ms: f64,
    pub pipeline_ms: f64,
    pub offset_ms: f64,
    pub rig_ms: f64,
    /// Per-frame cost of estimate + rig, for comparison with a 16.7 ms budget
    pub per_frame_us: f64,
}

/// Deterministic full-size detector output
fn synthetic_input(timestamp_ms: f64) -> FrameInput {
    let grid = |n: usize| {
        LandmarkSet::new(
            (0..n)
                .map(|i| {
                    let t = i as f32 / n as f32;
                    Landmark::new(0.3 + 0.4 * t, 0.2 + 0.5 * (t * 7.0).fract(), 0.01 * t)
                })
                .collect(),
        )
    };
    FrameInput {
        timestamp_ms,
        pose_landmarks: Some(grid(POSE_LANDMARK_COUNT)),
        face_landmarks: Some(grid(FACE_MESH_LANDMARK_COUNT)),
        blendshapes: None,
    }
}

/// Time the per-frame hot path: estimation, calibration, rig mapping
#[wasm_bindgen]
pub fn run_benchmarks(iterations: i32) -> Result<JsValue, JsValue> {
    use std::hint::black_box;

    let perf = web_sys::window()
        .and_then(|w| w.performance())
        .ok_or_else(|| JsValue::from_str("performance API unavailable"))?;

    let input = synthetic_input(0.0);
    let estimator = PoseEstimator::default();
    let mapping = RigMapping::default();

    // Warm-up to trigger JIT
    for _ in 0..1_000 {
        black_box(estimator.estimate(black_box(&input)));
    }

    // 1. Estimator only
    let start = perf.now();
    for _ in 0..iterations {
        black_box(estimator.estimate(black_box(&input)));
    }
    let estimate_ms = perf.now() - start;

    // 2. Full pipeline at 60 fps, including a calibration window
    let mut pipeline = FramePipeline::default();
    pipeline.start_calibration(0.0);
    let start = perf.now();
    for i in 0..iterations {
        let frame_input = FrameInput {
            timestamp_ms: i as f64 * 16.7,
            ..input.clone()
        };
        black_box(pipeline.process_frame(&frame_input));
    }
    let pipeline_ms = perf.now() - start;

    // 3. Offset over a long window
    let sample = estimator.estimate(&input);
    let samples: Vec<CalibrationSample> = (0..iterations.max(1))
        .filter_map(|_| CalibrationSample::from_estimate(&sample))
        .collect();
    let start = perf.now();
    black_box(calculate_offset(black_box(&samples)).ok());
    let offset_ms = perf.now() - start;

    // 4. Rig mapping
    let frame = pipeline.last_frame().copied().unwrap_or_default();
    let start = perf.now();
    let mut pose = RigPose::rest_pose();
    for _ in 0..iterations {
        pose = black_box(pose.with_frame(black_box(&frame), &mapping));
    }
    let rig_ms = perf.now() - start;

    let per_frame_us = if iterations > 0 {
        (estimate_ms + rig_ms) * 1000.0 / iterations as f64
    } else {
        0.0
    };

    let result = BenchmarkResults {
        iterations,
        estimate_ms,
        pipeline_ms,
        offset_ms,
        rig_ms,
        per_frame_us,
    };

    serde_wasm_bindgen::to_value(&result).map_err(JsValue::from)
}
