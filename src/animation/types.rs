use std::collections::HashMap;

use nalgebra_glm as glm;

use crate::error::ViewerError;
use crate::model::{ClipData, SkeletonData, TrackData};

/// Local transform of a single bone at a sampled instant.
#[derive(Debug, Clone, Copy)]
pub struct BoneTransform {
    pub translation: glm::Vec3,
    pub rotation: glm::Quat,
    pub scale: glm::Vec3,
}

impl BoneTransform {
    pub fn identity() -> Self {
        Self {
            translation: glm::vec3(0.0, 0.0, 0.0),
            rotation: glm::quat_identity(),
            scale: glm::vec3(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> glm::Mat4 {
        let t = glm::translation(&self.translation);
        let r = glm::quat_to_mat4(&glm::quat_normalize(&self.rotation));
        let s = glm::scaling(&self.scale);
        t * r * s
    }
}

/// Per-bone local transforms, indexed like `Skeleton::bones`.
/// Ephemeral: recomputed every evaluation, never persisted.
#[derive(Debug, Clone)]
pub struct Pose {
    pub transforms: Vec<BoneTransform>,
}

impl Pose {
    pub fn identity(bone_count: usize) -> Self {
        Self {
            transforms: vec![BoneTransform::identity(); bone_count],
        }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    /// Bind-space offset (inverse bind) matrix used for skinning.
    pub inverse_bind: glm::Mat4,
}

/// Runtime skeleton, compiled once from the asset data model.
/// Invariant: every bone's parent index is smaller than its own index.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
    name_to_index: HashMap<String, usize>,
}

impl Skeleton {
    pub fn from_data(data: &SkeletonData) -> Result<Self, ViewerError> {
        let mut bones = Vec::with_capacity(data.bones.len());
        let mut name_to_index = HashMap::with_capacity(data.bones.len());

        for (index, bone) in data.bones.iter().enumerate() {
            if name_to_index.insert(bone.name.clone(), index).is_some() {
                return Err(ViewerError::new("skeleton-duplicate-bone")
                    .with_arg("name", &bone.name));
            }
            let parent = if bone.parent < 0 {
                None
            } else {
                let parent = bone.parent as usize;
                // Parent-before-child order is what lets the resolver run in a
                // single index-order pass.
                if parent >= index {
                    return Err(ViewerError::new("skeleton-parent-order")
                        .with_arg("name", &bone.name)
                        .with_arg("parent", bone.parent));
                }
                Some(parent)
            };
            bones.push(Bone {
                name: bone.name.clone(),
                parent,
                inverse_bind: glm::Mat4::from_column_slice(&bone.offset),
            });
        }

        Ok(Self {
            bones,
            name_to_index,
        })
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyPosition {
    pub time: f32,
    pub value: glm::Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct KeyRotation {
    pub time: f32,
    pub value: glm::Quat,
}

#[derive(Debug, Clone, Copy)]
pub struct KeyScale {
    pub time: f32,
    pub value: glm::Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct BoneTrack {
    pub positions: Vec<KeyPosition>,
    pub rotations: Vec<KeyRotation>,
    pub scalings: Vec<KeyScale>,
}

impl BoneTrack {
    fn from_data(data: &TrackData) -> Self {
        let mut track = Self {
            positions: data
                .positions
                .iter()
                .map(|k| KeyPosition {
                    time: k.time,
                    value: glm::vec3(k.value[0], k.value[1], k.value[2]),
                })
                .collect(),
            rotations: data
                .rotations
                .iter()
                .map(|k| KeyRotation {
                    time: k.time,
                    // quat(w, x, y, z); document stores (x, y, z, w)
                    value: glm::quat(k.value[3], k.value[0], k.value[1], k.value[2]),
                })
                .collect(),
            scalings: data
                .scalings
                .iter()
                .map(|k| KeyScale {
                    time: k.time,
                    value: glm::vec3(k.value[0], k.value[1], k.value[2]),
                })
                .collect(),
        };
        track
            .positions
            .sort_by(|a, b| a.time.total_cmp(&b.time));
        track
            .rotations
            .sort_by(|a, b| a.time.total_cmp(&b.time));
        track.scalings.sort_by(|a, b| a.time.total_cmp(&b.time));
        track
    }
}

/// Immutable animation clip: duration plus per-bone tracks in skeleton
/// index order. Bones without a track stay `None` and sample as identity.
#[derive(Debug, Clone)]
pub struct Clip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Option<BoneTrack>>,
}

impl Clip {
    pub fn compile(data: &ClipData, skeleton: &Skeleton) -> Result<Self, ViewerError> {
        if data.duration <= 0.0 {
            return Err(ViewerError::new("clip-bad-duration")
                .with_arg("clip", &data.name)
                .with_arg("duration", data.duration));
        }

        let mut tracks: Vec<Option<BoneTrack>> = vec![None; skeleton.bone_count()];
        for (bone_name, track) in &data.tracks {
            match skeleton.bone_index(bone_name) {
                Some(index) => tracks[index] = Some(BoneTrack::from_data(track)),
                None => {
                    log::warn!(
                        "clip '{}': track for unknown bone '{}' skipped",
                        data.name,
                        bone_name
                    );
                }
            }
        }

        Ok(Self {
            name: data.name.clone(),
            duration: data.duration,
            tracks,
        })
    }
}

#[cfg(test)]
pub mod test_fixtures {
    use super::*;
    use crate::model::{BoneData, QuatKeyData, VectorKeyData};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    pub fn identity_offset() -> [f32; 16] {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        m
    }

    /// root -> spine -> head chain.
    pub fn test_skeleton() -> Arc<Skeleton> {
        let data = SkeletonData {
            bones: vec![
                BoneData {
                    name: "root".into(),
                    parent: -1,
                    offset: identity_offset(),
                },
                BoneData {
                    name: "spine".into(),
                    parent: 0,
                    offset: identity_offset(),
                },
                BoneData {
                    name: "head".into(),
                    parent: 1,
                    offset: identity_offset(),
                },
            ],
        };
        Arc::new(Skeleton::from_data(&data).unwrap())
    }

    /// Clip with a root translation ramping x from 0 to `reach` over `duration`.
    pub fn ramp_clip(name: &str, duration: f32, reach: f32, skeleton: &Skeleton) -> Arc<Clip> {
        let mut tracks = BTreeMap::new();
        tracks.insert(
            "root".to_string(),
            crate::model::TrackData {
                positions: vec![
                    VectorKeyData {
                        time: 0.0,
                        value: [0.0, 0.0, 0.0],
                    },
                    VectorKeyData {
                        time: duration,
                        value: [reach, 0.0, 0.0],
                    },
                ],
                rotations: vec![QuatKeyData {
                    time: 0.0,
                    value: [0.0, 0.0, 0.0, 1.0],
                }],
                scalings: vec![],
            },
        );
        let data = ClipData {
            name: name.to_string(),
            duration,
            tracks,
        };
        Arc::new(Clip::compile(&data, skeleton).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoneData;

    #[test]
    fn parent_must_come_before_child() {
        let data = SkeletonData {
            bones: vec![
                BoneData {
                    name: "child".into(),
                    parent: 1,
                    offset: test_fixtures::identity_offset(),
                },
                BoneData {
                    name: "root".into(),
                    parent: -1,
                    offset: test_fixtures::identity_offset(),
                },
            ],
        };
        let err = Skeleton::from_data(&data).unwrap_err();
        assert_eq!(err.key, "skeleton-parent-order");
    }

    #[test]
    fn duplicate_bone_names_rejected() {
        let data = SkeletonData {
            bones: vec![
                BoneData {
                    name: "root".into(),
                    parent: -1,
                    offset: test_fixtures::identity_offset(),
                },
                BoneData {
                    name: "root".into(),
                    parent: 0,
                    offset: test_fixtures::identity_offset(),
                },
            ],
        };
        let err = Skeleton::from_data(&data).unwrap_err();
        assert_eq!(err.key, "skeleton-duplicate-bone");
    }

    #[test]
    fn zero_duration_clip_rejected() {
        let skeleton = test_fixtures::test_skeleton();
        let data = ClipData {
            name: "broken".into(),
            duration: 0.0,
            tracks: Default::default(),
        };
        let err = Clip::compile(&data, &skeleton).unwrap_err();
        assert_eq!(err.key, "clip-bad-duration");
    }
}
