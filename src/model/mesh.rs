use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    #[serde(default)]
    pub uvs: Vec<[f32; 2]>,
    /// Up to four bone influences per vertex; empty for unskinned meshes.
    #[serde(default)]
    pub joints: Vec<[u16; 4]>,
    #[serde(default)]
    pub weights: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
    /// Optional diffuse PNG, relative to the asset directory.
    #[serde(default)]
    pub texture: Option<String>,
}

impl MeshData {
    pub fn is_skinned(&self) -> bool {
        !self.joints.is_empty()
    }
}
