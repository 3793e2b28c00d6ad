use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorKeyData {
    pub time: f32,
    pub value: [f32; 3],
}

/// Rotation keyframe, quaternion stored as (x, y, z, w).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuatKeyData {
    pub time: f32,
    pub value: [f32; 4],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackData {
    #[serde(default)]
    pub positions: Vec<VectorKeyData>,
    #[serde(default)]
    pub rotations: Vec<QuatKeyData>,
    #[serde(default)]
    pub scalings: Vec<VectorKeyData>,
}

/// One animation clip document: a duration plus per-bone keyframe tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipData {
    pub name: String,
    pub duration: f32,
    #[serde(default)]
    pub tracks: BTreeMap<String, TrackData>,
}
