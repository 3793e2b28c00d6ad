// Clip sampling: evaluate per-bone local transforms at a wrapped time.

use nalgebra_glm as glm;

use super::types::{BoneTrack, BoneTransform, Clip, KeyPosition, KeyRotation, KeyScale, Pose};

/// Wrap a playback time into `[0, duration)`. Looping semantics: no clamping,
/// no stopping at the end.
pub fn wrap_time(time: f32, duration: f32) -> f32 {
    time.rem_euclid(duration)
}

/// Evaluate the pose of `clip` at `time`. Bones without a track sample as the
/// identity local transform.
pub fn sample(clip: &Clip, time: f32) -> Pose {
    let t = wrap_time(time, clip.duration);
    let transforms = clip
        .tracks
        .iter()
        .map(|track| match track {
            Some(track) => sample_track(track, t),
            None => BoneTransform::identity(),
        })
        .collect();
    Pose { transforms }
}

fn sample_track(track: &BoneTrack, t: f32) -> BoneTransform {
    BoneTransform {
        translation: sample_positions(&track.positions, t),
        rotation: sample_rotations(&track.rotations, t),
        scale: sample_scalings(&track.scalings, t),
    }
}

fn sample_positions(keys: &[KeyPosition], t: f32) -> glm::Vec3 {
    match surrounding(keys.iter().map(|k| k.time), t) {
        Surround::Empty => glm::vec3(0.0, 0.0, 0.0),
        Surround::At(i) => keys[i].value,
        Surround::Between(a, b, f) => glm::lerp(&keys[a].value, &keys[b].value, f),
    }
}

fn sample_rotations(keys: &[KeyRotation], t: f32) -> glm::Quat {
    match surrounding(keys.iter().map(|k| k.time), t) {
        Surround::Empty => glm::quat_identity(),
        Surround::At(i) => keys[i].value,
        Surround::Between(a, b, f) => {
            glm::quat_normalize(&glm::quat_slerp(&keys[a].value, &keys[b].value, f))
        }
    }
}

fn sample_scalings(keys: &[KeyScale], t: f32) -> glm::Vec3 {
    match surrounding(keys.iter().map(|k| k.time), t) {
        Surround::Empty => glm::vec3(1.0, 1.0, 1.0),
        Surround::At(i) => keys[i].value,
        Surround::Between(a, b, f) => glm::lerp(&keys[a].value, &keys[b].value, f),
    }
}

enum Surround {
    Empty,
    /// Single surviving key, or exact hit on a key time.
    At(usize),
    /// Indices of the two surrounding keys plus the interpolation factor.
    Between(usize, usize, f32),
}

/// Find the keyframes surrounding `t` in an ascending time sequence.
/// Before the first key the first is held; past the last key the last is held.
fn surrounding(times: impl Iterator<Item = f32> + Clone, t: f32) -> Surround {
    let times: Vec<f32> = times.collect();
    if times.is_empty() {
        return Surround::Empty;
    }
    if t <= times[0] {
        return Surround::At(0);
    }
    for i in 0..times.len() - 1 {
        if t < times[i + 1] {
            let span = times[i + 1] - times[i];
            if span <= 0.0 {
                return Surround::At(i);
            }
            let f = (t - times[i]) / span;
            return Surround::Between(i, i + 1, f);
        }
    }
    Surround::At(times.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::types::test_fixtures::{ramp_clip, test_skeleton};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn sampling_loops_modulo_duration() {
        let skeleton = test_skeleton();
        let clip = ramp_clip("walk", 2.0, 1.0, &skeleton);
        for k in [-2i32, -1, 0, 1, 3] {
            let t = 0.5 + k as f32 * clip.duration;
            let pose = sample(&clip, t);
            let base = sample(&clip, 0.5);
            assert!(
                approx(pose.transforms[0].translation.x, base.transforms[0].translation.x),
                "t={t}"
            );
        }
    }

    #[test]
    fn midpoint_is_linearly_interpolated() {
        let skeleton = test_skeleton();
        let clip = ramp_clip("walk", 2.0, 4.0, &skeleton);
        let pose = sample(&clip, 1.0);
        assert!(approx(pose.transforms[0].translation.x, 2.0));
    }

    #[test]
    fn trackless_bones_sample_as_identity() {
        let skeleton = test_skeleton();
        let clip = ramp_clip("walk", 2.0, 1.0, &skeleton);
        let pose = sample(&clip, 0.7);
        // spine and head have no tracks
        for i in [1usize, 2] {
            let t = &pose.transforms[i];
            assert!(approx(t.translation.x, 0.0));
            assert!(approx(t.scale.x, 1.0));
            assert!(approx(t.rotation.w, 1.0));
        }
    }

    #[test]
    fn time_before_first_key_holds_first() {
        let skeleton = test_skeleton();
        let clip = ramp_clip("walk", 2.0, 1.0, &skeleton);
        let pose = sample(&clip, 0.0);
        assert!(approx(pose.transforms[0].translation.x, 0.0));
    }
}
