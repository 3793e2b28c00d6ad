// Bone hierarchy resolution: compose local transforms down the tree into
// model-space transforms.

use nalgebra_glm as glm;

use super::types::{Pose, Skeleton};

/// Compute each bone's model-space transform from its pose-local transform.
/// Bones are stored parent-before-child (validated at load), so a single
/// index-order pass suffices; roots compose with the identity.
pub fn resolve(skeleton: &Skeleton, pose: &Pose) -> Vec<glm::Mat4> {
    let mut globals: Vec<glm::Mat4> = Vec::with_capacity(skeleton.bone_count());
    for (index, bone) in skeleton.bones.iter().enumerate() {
        let local = pose.transforms[index].to_matrix();
        let global = match bone.parent {
            Some(parent) => globals[parent] * local,
            None => local,
        };
        globals.push(global);
    }
    globals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::sampler::sample;
    use crate::animation::types::test_fixtures::{ramp_clip, test_skeleton};

    #[test]
    fn children_inherit_parent_translation() {
        let skeleton = test_skeleton();
        let clip = ramp_clip("walk", 2.0, 4.0, &skeleton);
        let pose = sample(&clip, 1.0); // root at x = 2
        let globals = resolve(&skeleton, &pose);

        // spine and head have identity locals, so they sit at the root's
        // model-space position
        for i in 0..3 {
            assert!((globals[i][(0, 3)] - 2.0).abs() < 1e-4, "bone {i}");
        }
    }

    #[test]
    fn resolve_is_deterministic() {
        let skeleton = test_skeleton();
        let clip = ramp_clip("walk", 2.0, 4.0, &skeleton);
        let pose = sample(&clip, 0.33);
        let first = resolve(&skeleton, &pose);
        let second = resolve(&skeleton, &pose);
        assert_eq!(first, second);
    }

    #[test]
    fn root_uses_identity_parent() {
        let skeleton = test_skeleton();
        let pose = crate::animation::types::Pose::identity(skeleton.bone_count());
        let globals = resolve(&skeleton, &pose);
        assert_eq!(globals[0], glm::Mat4::identity());
    }
}
