use serde::{Deserialize, Serialize};

use super::{MeshData, SkeletonData};

fn default_attach_bone() -> String {
    "mixamorig_Head".to_string()
}

/// Which clips drive which locomotion/action role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipPaths {
    pub idle: String,
    pub walk: String,
    pub punch: String,
    pub kick: String,
}

/// Top-level character asset document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDoc {
    pub name: String,
    pub skeleton: SkeletonData,
    pub mesh: MeshData,
    pub clips: ClipPaths,
    /// Bone the equipped hat is attached to.
    #[serde(default = "default_attach_bone")]
    pub attach_bone: String,
}

/// One hat entry: a prop mesh plus its attachment and pickup parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HatDoc {
    pub name: String,
    pub kind: String,
    /// Path to the hat mesh document, relative to the asset directory.
    pub mesh: String,
    /// Scale applied when worn on the head bone.
    pub scale: f32,
    /// Offset applied after scaling, in head-bone space.
    pub offset: [f32; 3],
    pub pickup_position: [f32; 3],
    pub pickup_radius: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HatsDoc {
    pub hats: Vec<HatDoc>,
}
