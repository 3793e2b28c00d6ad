// Two-pose cross-fade with a fixed per-bone weight.

use nalgebra_glm as glm;

use super::types::{BoneTransform, Pose};

/// Interpolate `a` toward `b` by `t` in [0, 1]. The endpoints are exact:
/// `t == 0` returns `a` unchanged and `t == 1` returns `b` unchanged, so a
/// finished transition carries no interpolation drift.
pub fn blend(a: &Pose, b: &Pose, t: f32) -> Pose {
    if t <= 0.0 {
        return a.clone();
    }
    if t >= 1.0 {
        return b.clone();
    }

    debug_assert_eq!(a.len(), b.len());
    let transforms = a
        .transforms
        .iter()
        .zip(&b.transforms)
        .map(|(a, b)| BoneTransform {
            translation: glm::lerp(&a.translation, &b.translation, t),
            rotation: glm::quat_normalize(&glm::quat_slerp(&a.rotation, &b.rotation, t)),
            scale: glm::lerp(&a.scale, &b.scale, t),
        })
        .collect();
    Pose { transforms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::sampler::sample;
    use crate::animation::types::test_fixtures::{ramp_clip, test_skeleton};

    #[test]
    fn endpoints_are_exact() {
        let skeleton = test_skeleton();
        let a = sample(&ramp_clip("a", 1.0, 1.0, &skeleton), 0.25);
        let b = sample(&ramp_clip("b", 1.0, 3.0, &skeleton), 0.75);

        let at_zero = blend(&a, &b, 0.0);
        let at_one = blend(&a, &b, 1.0);
        for i in 0..a.len() {
            assert_eq!(
                at_zero.transforms[i].translation,
                a.transforms[i].translation
            );
            assert_eq!(at_one.transforms[i].translation, b.transforms[i].translation);
        }
    }

    #[test]
    fn midpoint_translation_is_lerped() {
        let skeleton = test_skeleton();
        let a = sample(&ramp_clip("a", 1.0, 2.0, &skeleton), 1.0); // x = 2 at end... wrapped to 0
        let b = sample(&ramp_clip("b", 1.0, 2.0, &skeleton), 0.5); // x = 1

        let mid = blend(&a, &b, 0.5);
        let expected = (a.transforms[0].translation.x + b.transforms[0].translation.x) * 0.5;
        assert!((mid.transforms[0].translation.x - expected).abs() < 1e-5);
    }
}
