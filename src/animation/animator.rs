// Animation driver: owns playback time for a primary and optional secondary
// clip, advances them each frame and caches the resolved bone output.

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra_glm as glm;

use super::blend::blend;
use super::sampler::{sample, wrap_time};
use super::skeleton::resolve;
use super::types::{Clip, Skeleton};

/// One transition decision from the state machine: which clip(s) to play,
/// from which start times, at which blend factor. Consumed once by
/// [`Animator::play_animation`], never retained.
#[derive(Debug, Clone)]
pub struct BlendRequest {
    pub primary: Arc<Clip>,
    pub secondary: Option<Arc<Clip>>,
    pub primary_start: f32,
    pub secondary_start: f32,
    pub blend_factor: f32,
}

impl BlendRequest {
    pub fn single(clip: Arc<Clip>, start: f32) -> Self {
        Self {
            primary: clip,
            secondary: None,
            primary_start: start,
            secondary_start: 0.0,
            blend_factor: 0.0,
        }
    }
}

/// Immutable per-frame snapshot of the driver's playback state, returned by
/// [`Animator::update_animation`] and consumed by the state machine on the
/// next frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimatorSnapshot {
    pub primary_time: f32,
    pub secondary_time: f32,
    pub blend_factor: f32,
}

pub struct Animator {
    skeleton: Arc<Skeleton>,
    primary: Arc<Clip>,
    secondary: Option<Arc<Clip>>,
    primary_time: f32,
    secondary_time: f32,
    blend_factor: f32,
    /// Skinning matrices in skeleton index order, recomputed once per update.
    final_matrices: Vec<glm::Mat4>,
    /// Model-space transform per bone name, for attachments.
    bone_globals: HashMap<String, glm::Mat4>,
}

impl Animator {
    pub fn new(skeleton: Arc<Skeleton>, initial: Arc<Clip>) -> Self {
        let mut animator = Self {
            final_matrices: vec![glm::Mat4::identity(); skeleton.bone_count()],
            bone_globals: HashMap::with_capacity(skeleton.bone_count()),
            skeleton,
            primary: initial,
            secondary: None,
            primary_time: 0.0,
            secondary_time: 0.0,
            blend_factor: 0.0,
        };
        animator.recompute();
        animator
    }

    /// Replace the active clip(s) and reseed both timers. Idempotent within a
    /// frame: only the last call before `update_animation` takes effect.
    /// `secondary: None` is the valid single-clip mode.
    pub fn play_animation(&mut self, request: BlendRequest) {
        self.primary = request.primary;
        self.secondary = request.secondary;
        self.primary_time = request.primary_start;
        self.secondary_time = request.secondary_start;
        self.blend_factor = request.blend_factor;
    }

    /// Advance both timers (looping, independently), re-evaluate the blended
    /// pose and cache this frame's bone output. The only mutation point
    /// besides `play_animation`.
    pub fn update_animation(&mut self, delta_time: f32) -> AnimatorSnapshot {
        self.primary_time = wrap_time(self.primary_time + delta_time, self.primary.duration);
        if let Some(secondary) = &self.secondary {
            self.secondary_time = wrap_time(self.secondary_time + delta_time, secondary.duration);
        }
        self.recompute();
        self.snapshot()
    }

    pub fn snapshot(&self) -> AnimatorSnapshot {
        AnimatorSnapshot {
            primary_time: self.primary_time,
            secondary_time: self.secondary_time,
            blend_factor: self.blend_factor,
        }
    }

    /// Cached skinning matrices, one per bone in skeleton index order.
    pub fn final_bone_matrices(&self) -> &[glm::Mat4] {
        &self.final_matrices
    }

    /// Cached model-space transform of a named bone. Unknown names return the
    /// identity sentinel; attachment bones are optional in some rigs and a
    /// miss must never be fatal.
    pub fn bone_global_transform(&self, name: &str) -> glm::Mat4 {
        match self.bone_globals.get(name) {
            Some(m) => *m,
            None => {
                log::debug!("bone '{name}' not found, returning identity");
                glm::Mat4::identity()
            }
        }
    }

    pub fn primary_clip(&self) -> &Arc<Clip> {
        &self.primary
    }

    pub fn secondary_clip(&self) -> Option<&Arc<Clip>> {
        self.secondary.as_ref()
    }

    fn recompute(&mut self) {
        let pose = {
            let primary = sample(&self.primary, self.primary_time);
            match &self.secondary {
                Some(secondary) => {
                    let secondary = sample(secondary, self.secondary_time);
                    blend(&primary, &secondary, self.blend_factor)
                }
                None => primary,
            }
        };

        let globals = resolve(&self.skeleton, &pose);
        self.bone_globals.clear();
        for (index, bone) in self.skeleton.bones.iter().enumerate() {
            self.bone_globals.insert(bone.name.clone(), globals[index]);
            self.final_matrices[index] = globals[index] * bone.inverse_bind;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::types::test_fixtures::{ramp_clip, test_skeleton};

    #[test]
    fn last_play_call_wins_within_frame() {
        let skeleton = test_skeleton();
        let idle = ramp_clip("idle", 3.0, 1.0, &skeleton);
        let walk = ramp_clip("walk", 2.0, 1.0, &skeleton);
        let mut animator = Animator::new(skeleton.clone(), idle.clone());

        animator.play_animation(BlendRequest {
            primary: idle.clone(),
            secondary: Some(walk.clone()),
            primary_start: 1.0,
            secondary_start: 0.5,
            blend_factor: 0.4,
        });
        animator.play_animation(BlendRequest::single(walk.clone(), 0.25));
        let snap = animator.update_animation(0.0);

        assert_eq!(animator.primary_clip().name, "walk");
        assert!(animator.secondary_clip().is_none());
        assert!((snap.primary_time - 0.25).abs() < 1e-6);
        assert!((snap.blend_factor - 0.0).abs() < 1e-6);
    }

    #[test]
    fn timers_advance_independently_and_loop() {
        let skeleton = test_skeleton();
        let idle = ramp_clip("idle", 1.0, 1.0, &skeleton);
        let walk = ramp_clip("walk", 2.0, 1.0, &skeleton);
        let mut animator = Animator::new(skeleton.clone(), idle.clone());

        animator.play_animation(BlendRequest {
            primary: idle.clone(),
            secondary: Some(walk.clone()),
            primary_start: 0.9,
            secondary_start: 1.9,
            blend_factor: 0.5,
        });
        let snap = animator.update_animation(0.2);

        // idle wraps at 1.0, walk at 2.0
        assert!((snap.primary_time - 0.1).abs() < 1e-5);
        assert!((snap.secondary_time - 0.1).abs() < 1e-5);
    }

    #[test]
    fn secondary_timer_frozen_in_single_clip_mode() {
        let skeleton = test_skeleton();
        let idle = ramp_clip("idle", 3.0, 1.0, &skeleton);
        let mut animator = Animator::new(skeleton.clone(), idle.clone());

        animator.play_animation(BlendRequest::single(idle.clone(), 0.0));
        let snap = animator.update_animation(0.5);
        assert_eq!(snap.secondary_time, 0.0);
    }

    #[test]
    fn missing_bone_lookup_returns_identity() {
        let skeleton = test_skeleton();
        let idle = ramp_clip("idle", 3.0, 1.0, &skeleton);
        let animator = Animator::new(skeleton, idle);
        assert_eq!(
            animator.bone_global_transform("nonexistent"),
            glm::Mat4::identity()
        );
    }

    #[test]
    fn known_bone_lookup_matches_resolved_global() {
        let skeleton = test_skeleton();
        let clip = ramp_clip("walk", 2.0, 4.0, &skeleton);
        let mut animator = Animator::new(skeleton, clip.clone());
        animator.play_animation(BlendRequest::single(clip, 0.0));
        animator.update_animation(1.0); // root at x = 2

        let head = animator.bone_global_transform("head");
        assert!((head[(0, 3)] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn matrices_are_cached_not_recomputed_per_query() {
        let skeleton = test_skeleton();
        let clip = ramp_clip("walk", 2.0, 1.0, &skeleton);
        let mut animator = Animator::new(skeleton.clone(), clip);
        animator.update_animation(0.4);

        let first = animator.final_bone_matrices().to_vec();
        let second = animator.final_bone_matrices().to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), skeleton.bone_count());
    }
}
