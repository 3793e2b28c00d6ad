use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneData {
    pub name: String,
    pub parent: i32, // -1 means no parent
    /// Column-major inverse-bind (offset) matrix.
    pub offset: [f32; 16],
}

impl Default for BoneData {
    fn default() -> Self {
        let mut offset = [0.0; 16];
        offset[0] = 1.0;
        offset[5] = 1.0;
        offset[10] = 1.0;
        offset[15] = 1.0;
        Self {
            name: String::new(),
            parent: -1,
            offset,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkeletonData {
    pub bones: Vec<BoneData>,
}
