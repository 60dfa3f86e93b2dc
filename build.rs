//! Build script for tracker preset validation
//!
//! This script runs at compile time and checks every JSON preset under
//! `presets/` against the same limits `TrackerConfig::validate` enforces.

// Include the shared tracker constants
#[path = "src/tracker_constants.rs"]
mod tracker_constants;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracker_constants::Limits;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Axes {
    pitch: Option<f32>,
    yaw: Option<f32>,
    roll: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Preset {
    calibration: BTreeMap<String, f64>,
    pipeline: BTreeMap<String, serde_json::Value>,
    head: HeadPreset,
    body: BodyPreset,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HeadPreset {
    sensitivity: Axes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BodyPreset {
    torso: Axes,
    arms: Axes,
    forearms: Axes,
    shoulder_sensitivity: Option<f32>,
}

/// Validate a single preset, collecting every problem
fn validate_preset(preset: &Preset) -> Vec<String> {
    let mut errors = Vec::new();

    for (name, value) in &preset.calibration {
        let checked = match name.as_str() {
            "duration_ms" | "sample_interval_ms" => Limits::check_positive_ms(name, *value),
            "retry_delay_ms" | "completion_notice_ms" => Limits::check_delay_ms(name, *value),
            other => Err(format!("unknown calibration field '{}'", other)),
        };
        errors.extend(checked.err());
    }

    for (name, value) in &preset.pipeline {
        let checked = match (name.as_str(), value.as_f64()) {
            ("auto_start_delay_ms", Some(ms)) => Limits::check_delay_ms(name, ms),
            ("detection_timeout_ms", Some(ms)) => Limits::check_positive_ms(name, ms),
            ("auto_start_delay_ms" | "detection_timeout_ms", None) => Err(format!("{} must be a number", name)),
            _ => Ok(()),
        };
        errors.extend(checked.err());
    }

    let axes = [
        ("head", &preset.head.sensitivity),
        ("torso", &preset.body.torso),
        ("arms", &preset.body.arms),
        ("forearms", &preset.body.forearms),
    ];
    for (joint, axes) in axes {
        for (axis, value) in [("pitch", axes.pitch), ("yaw", axes.yaw), ("roll", axes.roll)] {
            if let Some(v) = value {
                errors.extend(Limits::check_sensitivity(&format!("{}.{}", joint, axis), v).err());
            }
        }
    }
    if let Some(v) = preset.body.shoulder_sensitivity {
        errors.extend(Limits::check_sensitivity("shoulders", v).err());
    }

    errors
}

/// Validate a preset file
fn validate_preset_file(path: &Path) -> Result<(), String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    let preset: Preset = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

    let errors = validate_preset(&preset);
    if errors.is_empty() {
        println!("cargo:warning=✓ {} validated", path.display());
        Ok(())
    } else {
        Err(format!(
            "Preset '{}' is out of range:\n  {}",
            path.display(),
            errors.join("\n  ")
        ))
    }
}

fn main() {
    let preset_dir = Path::new("presets");

    // Rerun if shared constants change
    println!("cargo:rerun-if-changed=src/tracker_constants.rs");

    if !preset_dir.exists() {
        println!("cargo:warning=Preset directory not found, skipping validation");
        return;
    }

    let mut has_errors = false;

    if let Ok(entries) = fs::read_dir(preset_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                println!("cargo:rerun-if-changed={}", path.display());

                if let Err(e) = validate_preset_file(&path) {
                    println!("cargo:warning=VALIDATION ERROR: {}", e);
                    has_errors = true;
                }
            }
        }
    }

    if has_errors {
        panic!("Preset validation failed! Fix the values in presets/.");
    }

    // Rerun if the presets directory changes
    println!("cargo:rerun-if-changed={}", preset_dir.display());
}
