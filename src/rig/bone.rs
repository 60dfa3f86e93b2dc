use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Avatar bones driven by the tracker.
/// Ordered by lookup priority: when one asset node matches several
/// patterns, the earlier bone claims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RigBone {
    Head = 0,
    LeftShoulder = 1,
    RightShoulder = 2,
    LeftUpperArm = 3,
    RightUpperArm = 4,
    Spine = 5,
    LeftForearm = 6,
    RightForearm = 7,
    Jaw = 8,
    LeftEye = 9,
    RightEye = 10,
    LeftHand = 11,
    RightHand = 12,
}

impl RigBone {
    /// Total number of driven bones
    pub const COUNT: usize = 13;

    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// All bones in lookup priority order
    pub const ALL: [RigBone; Self::COUNT] = [
        RigBone::Head,
        RigBone::LeftShoulder,
        RigBone::RightShoulder,
        RigBone::LeftUpperArm,
        RigBone::RightUpperArm,
        RigBone::Spine,
        RigBone::LeftForearm,
        RigBone::RightForearm,
        RigBone::Jaw,
        RigBone::LeftEye,
        RigBone::RightEye,
        RigBone::LeftHand,
        RigBone::RightHand,
    ];

    /// Node name fragment for the bundled avatar (lowercase)
    pub const fn default_pattern(self) -> &'static str {
        match self {
            RigBone::Head => "head_3",
            RigBone::LeftShoulder => "leftshoulder_28",
            RigBone::RightShoulder => "rightshoulder_52",
            RigBone::LeftUpperArm => "leftarm_27",
            RigBone::RightUpperArm => "rightarm_51",
            RigBone::Spine => "spine1_54",
            RigBone::LeftForearm => "leftforearm_26",
            RigBone::RightForearm => "rightforearm_50",
            RigBone::Jaw => "jaw",
            RigBone::LeftEye => "lefteye_1",
            RigBone::RightEye => "righteye_2",
            RigBone::LeftHand => "lefthand_25",
            RigBone::RightHand => "righthand_49",
        }
    }
}

/// Per-bone name fragments; bones not listed use their default pattern
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BonePatterns {
    overrides: HashMap<RigBone, String>,
}

impl BonePatterns {
    pub fn with_pattern(mut self, bone: RigBone, pattern: &str) -> Self {
        self.overrides.insert(bone, pattern.to_lowercase());
        self
    }

    pub fn pattern(&self, bone: RigBone) -> &str {
        self.overrides
            .get(&bone)
            .map(String::as_str)
            .unwrap_or(bone.default_pattern())
    }
}

/// Which asset node drives each bone, resolved once when the model loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoneBindings {
    nodes: [Option<u32>; RigBone::COUNT],
}

impl BoneBindings {
    /// Match asset node names against the patterns.
    ///
    /// Names are compared lowercase by substring. Each node binds at most
    /// one bone (the first in priority order whose pattern it contains) and
    /// each bone keeps the first node that matched it.
    pub fn resolve<S: AsRef<str>>(node_names: &[S], patterns: &BonePatterns) -> Self {
        let mut nodes = [None; RigBone::COUNT];

        for (index, name) in node_names.iter().enumerate() {
            let name = name.as_ref().to_lowercase();
            let Some(bone) = RigBone::ALL
                .into_iter()
                .find(|bone| name.contains(&patterns.pattern(*bone).to_lowercase()))
            else {
                continue;
            };

            let slot = &mut nodes[bone.index()];
            if slot.is_none() {
                log::info!("Found {:?} bone: {}", bone, name);
                *slot = Some(index as u32);
            }
        }

        let bindings = Self { nodes };
        for bone in bindings.missing() {
            log::warn!("No node matches {:?} ('{}')", bone, patterns.pattern(bone));
        }
        bindings
    }

    /// Asset node index bound to `bone`
    pub fn node(&self, bone: RigBone) -> Option<u32> {
        self.nodes[bone.index()]
    }

    pub fn missing(&self) -> impl Iterator<Item = RigBone> + '_ {
        RigBone::ALL.into_iter().filter(|bone| self.node(*bone).is_none())
    }

    /// Node index per bone in `RigBone` order, -1 where unbound
    pub fn to_node_indices(&self) -> Vec<i32> {
        self.nodes
            .iter()
            .map(|n| n.map_or(-1, |i| i as i32))
            .collect()
    }
}
