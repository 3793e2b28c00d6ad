// Locomotion/action state machine: decides which clip(s) play and how the
// cross-fade progresses, one step per frame.

use std::sync::Arc;

use super::animator::{AnimatorSnapshot, BlendRequest};
use super::types::Clip;
use crate::input::FrameInput;

/// A cross-fade commits once its accumulator passes this threshold.
pub const BLEND_COMMIT_THRESHOLD: f32 = 0.9;
/// The punch clip plays unblended until this primary time before fading out.
pub const PUNCH_RECOVERY_GATE: f32 = 0.7;
/// The kick clip plays unblended until this primary time before fading out.
pub const KICK_RECOVERY_GATE: f32 = 1.0;
/// Accumulator progress per frame.
pub const DEFAULT_BLEND_RATE: f32 = 0.055;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    IdleWalk,
    Walk,
    WalkIdle,
    IdlePunch,
    PunchIdle,
    IdleKick,
    KickIdle,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::IdleWalk => "idle->walk",
            Phase::Walk => "walk",
            Phase::WalkIdle => "walk->idle",
            Phase::IdlePunch => "idle->punch",
            Phase::PunchIdle => "punch->idle",
            Phase::IdleKick => "idle->kick",
            Phase::KickIdle => "kick->idle",
        }
    }
}

/// The four clips the machine schedules between.
#[derive(Clone)]
pub struct ClipSet {
    pub idle: Arc<Clip>,
    pub walk: Arc<Clip>,
    pub punch: Arc<Clip>,
    pub kick: Arc<Clip>,
}

/// Discrete phase plus the cross-fade accumulator. Mutated only by applying
/// the state returned from [`CharacterState::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterState {
    pub phase: Phase,
    pub blend_amount: f32,
    pub blend_rate: f32,
}

/// Result of one per-frame step: the explicit next state and the blend
/// request to hand to the driver, if any.
pub struct Transition {
    pub next: CharacterState,
    pub request: Option<BlendRequest>,
}

impl CharacterState {
    pub fn new(blend_rate: f32) -> Self {
        Self {
            phase: Phase::Idle,
            blend_amount: 0.0,
            blend_rate,
        }
    }

    /// Evaluate one frame of transition logic against this frame's input and
    /// the driver snapshot from the previous update. Pure: returns the next
    /// state instead of mutating in place.
    pub fn step(
        &self,
        input: &FrameInput,
        snap: &AnimatorSnapshot,
        clips: &ClipSet,
    ) -> Transition {
        match self.phase {
            Phase::Idle => {
                // Fixed priority: movement, then punch, then kick.
                if input.any_movement() {
                    self.begin_fade(Phase::IdleWalk, &clips.idle, &clips.walk, snap)
                } else if input.punch {
                    self.begin_fade(Phase::IdlePunch, &clips.idle, &clips.punch, snap)
                } else if input.kick {
                    self.begin_fade(Phase::IdleKick, &clips.idle, &clips.kick, snap)
                } else {
                    self.hold()
                }
            }
            Phase::IdleWalk => self.cross_fade(&clips.idle, &clips.walk, Phase::Walk, snap),
            Phase::Walk => {
                if !input.any_movement() {
                    // Fade-down begins accumulating next frame.
                    Transition {
                        next: CharacterState {
                            phase: Phase::WalkIdle,
                            blend_amount: 0.0,
                            blend_rate: self.blend_rate,
                        },
                        request: None,
                    }
                } else {
                    self.hold()
                }
            }
            Phase::WalkIdle => self.cross_fade(&clips.walk, &clips.idle, Phase::Idle, snap),
            Phase::IdlePunch => self.cross_fade(&clips.idle, &clips.punch, Phase::PunchIdle, snap),
            Phase::PunchIdle => {
                // Let the punch finish before blending out.
                if snap.primary_time > PUNCH_RECOVERY_GATE {
                    self.cross_fade(&clips.punch, &clips.idle, Phase::Idle, snap)
                } else {
                    self.hold()
                }
            }
            Phase::IdleKick => self.cross_fade(&clips.idle, &clips.kick, Phase::KickIdle, snap),
            Phase::KickIdle => {
                if snap.primary_time > KICK_RECOVERY_GATE {
                    self.cross_fade(&clips.kick, &clips.idle, Phase::Idle, snap)
                } else {
                    self.hold()
                }
            }
        }
    }

    fn hold(&self) -> Transition {
        Transition {
            next: *self,
            request: None,
        }
    }

    /// Enter a cross-fade: accumulator resets to zero, the outgoing clip
    /// keeps its current time and the incoming clip starts from zero.
    fn begin_fade(
        &self,
        phase: Phase,
        from: &Arc<Clip>,
        to: &Arc<Clip>,
        snap: &AnimatorSnapshot,
    ) -> Transition {
        log::debug!("{} -> {}", self.phase.name(), phase.name());
        Transition {
            next: CharacterState {
                phase,
                blend_amount: 0.0,
                blend_rate: self.blend_rate,
            },
            request: Some(BlendRequest {
                primary: from.clone(),
                secondary: Some(to.clone()),
                primary_start: snap.primary_time,
                secondary_start: 0.0,
                blend_factor: 0.0,
            }),
        }
    }

    /// Advance an in-flight cross-fade. The accumulator clamps to 1.0 on
    /// overshoot rather than wrapping, so a large rate still completes the
    /// transition. Past the commit threshold the incoming clip takes over
    /// alone, re-seeded from the secondary timer for continuity.
    fn cross_fade(
        &self,
        from: &Arc<Clip>,
        to: &Arc<Clip>,
        commit_phase: Phase,
        snap: &AnimatorSnapshot,
    ) -> Transition {
        let amount = (self.blend_amount + self.blend_rate).min(1.0);
        if amount > BLEND_COMMIT_THRESHOLD {
            log::debug!("{} -> {}", self.phase.name(), commit_phase.name());
            Transition {
                next: CharacterState {
                    phase: commit_phase,
                    blend_amount: 0.0,
                    blend_rate: self.blend_rate,
                },
                request: Some(BlendRequest::single(to.clone(), snap.secondary_time)),
            }
        } else {
            Transition {
                next: CharacterState {
                    phase: self.phase,
                    blend_amount: amount,
                    blend_rate: self.blend_rate,
                },
                request: Some(BlendRequest {
                    primary: from.clone(),
                    secondary: Some(to.clone()),
                    primary_start: snap.primary_time,
                    secondary_start: snap.secondary_time,
                    blend_factor: amount,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::animator::Animator;
    use crate::animation::types::test_fixtures::{ramp_clip, test_skeleton};

    fn test_clips() -> (ClipSet, Arc<crate::animation::types::Skeleton>) {
        let skeleton = test_skeleton();
        let clips = ClipSet {
            idle: ramp_clip("idle", 3.3, 1.0, &skeleton),
            walk: ramp_clip("walk", 2.06, 1.0, &skeleton),
            punch: ramp_clip("punch", 1.03, 1.0, &skeleton),
            kick: ramp_clip("kick", 1.6, 1.0, &skeleton),
        };
        (clips, skeleton)
    }

    /// Drives the machine + driver through one frame, the way the app does.
    fn run_frame(
        state: &mut CharacterState,
        animator: &mut Animator,
        snap: &mut AnimatorSnapshot,
        input: &FrameInput,
        clips: &ClipSet,
        dt: f32,
    ) {
        let transition = state.step(input, snap, clips);
        *state = transition.next;
        if let Some(request) = transition.request {
            animator.play_animation(request);
        }
        *snap = animator.update_animation(dt);
    }

    #[test]
    fn idle_is_stable_without_input() {
        let (clips, skeleton) = test_clips();
        let mut state = CharacterState::new(DEFAULT_BLEND_RATE);
        let mut animator = Animator::new(skeleton, clips.idle.clone());
        let mut snap = animator.snapshot();
        let input = FrameInput::default();

        for _ in 0..100 {
            run_frame(&mut state, &mut animator, &mut snap, &input, &clips, 0.016);
        }
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(animator.primary_clip().name, "idle");
        assert!(animator.secondary_clip().is_none());
    }

    #[test]
    fn movement_starts_walk_fade_and_accumulates() {
        let (clips, skeleton) = test_clips();
        let mut state = CharacterState::new(DEFAULT_BLEND_RATE);
        let mut animator = Animator::new(skeleton, clips.idle.clone());
        let mut snap = animator.snapshot();
        let moving = FrameInput {
            forward: true,
            ..Default::default()
        };

        // Transition frame: blend seeded at zero.
        run_frame(&mut state, &mut animator, &mut snap, &moving, &clips, 0.016);
        assert_eq!(state.phase, Phase::IdleWalk);
        assert_eq!(state.blend_amount, 0.0);
        assert_eq!(animator.secondary_clip().unwrap().name, "walk");

        // First accumulation frame: one blend_rate of progress, mirrored in
        // the blend factor handed to the driver.
        run_frame(&mut state, &mut animator, &mut snap, &moving, &clips, 0.016);
        assert!((state.blend_amount - 0.055).abs() < 1e-6);
        assert!((snap.blend_factor - 0.055).abs() < 1e-6);
    }

    #[test]
    fn walk_fade_commits_after_seventeen_frames() {
        let (clips, skeleton) = test_clips();
        let mut state = CharacterState::new(DEFAULT_BLEND_RATE);
        let mut animator = Animator::new(skeleton, clips.idle.clone());
        let mut snap = animator.snapshot();
        let moving = FrameInput {
            forward: true,
            ..Default::default()
        };

        // Enter IdleWalk, then accumulate: ceil(0.9 / 0.055) = 17 frames.
        run_frame(&mut state, &mut animator, &mut snap, &moving, &clips, 0.016);
        for frame in 0..17 {
            assert_eq!(state.phase, Phase::IdleWalk, "frame {frame}");
            run_frame(&mut state, &mut animator, &mut snap, &moving, &clips, 0.016);
        }
        assert_eq!(state.phase, Phase::Walk);
        assert_eq!(animator.primary_clip().name, "walk");
        assert!(animator.secondary_clip().is_none());
    }

    #[test]
    fn walk_commit_preserves_secondary_time() {
        let (clips, skeleton) = test_clips();
        let mut state = CharacterState::new(DEFAULT_BLEND_RATE);
        let mut animator = Animator::new(skeleton, clips.idle.clone());
        let mut snap = animator.snapshot();
        let moving = FrameInput {
            forward: true,
            ..Default::default()
        };

        run_frame(&mut state, &mut animator, &mut snap, &moving, &clips, 0.016);
        let mut last_secondary = snap.secondary_time;
        while state.phase == Phase::IdleWalk {
            last_secondary = snap.secondary_time;
            run_frame(&mut state, &mut animator, &mut snap, &moving, &clips, 0.016);
        }
        // The walk clip resumed from where the blend left it, plus one frame.
        assert!((snap.primary_time - (last_secondary + 0.016)).abs() < 1e-5);
    }

    #[test]
    fn releasing_keys_fades_back_to_idle() {
        let (clips, skeleton) = test_clips();
        let mut state = CharacterState {
            phase: Phase::Walk,
            blend_amount: 0.0,
            blend_rate: DEFAULT_BLEND_RATE,
        };
        let mut animator = Animator::new(skeleton, clips.walk.clone());
        let mut snap = animator.snapshot();
        let idle_input = FrameInput::default();

        run_frame(&mut state, &mut animator, &mut snap, &idle_input, &clips, 0.016);
        assert_eq!(state.phase, Phase::WalkIdle);

        for _ in 0..17 {
            run_frame(&mut state, &mut animator, &mut snap, &idle_input, &clips, 0.016);
        }
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(animator.primary_clip().name, "idle");
    }

    #[test]
    fn punch_recovery_gates_on_primary_time() {
        let (clips, _) = test_clips();
        let state = CharacterState {
            phase: Phase::PunchIdle,
            blend_amount: 0.0,
            blend_rate: DEFAULT_BLEND_RATE,
        };
        let input = FrameInput::default();

        // Below the gate: hold, no driver change.
        let snap = AnimatorSnapshot {
            primary_time: 0.5,
            secondary_time: 0.0,
            blend_factor: 0.0,
        };
        let transition = state.step(&input, &snap, &clips);
        assert_eq!(transition.next.phase, Phase::PunchIdle);
        assert_eq!(transition.next.blend_amount, 0.0);
        assert!(transition.request.is_none());

        // Past the gate: accumulation begins.
        let snap = AnimatorSnapshot {
            primary_time: 0.71,
            ..snap
        };
        let transition = state.step(&input, &snap, &clips);
        assert_eq!(transition.next.phase, Phase::PunchIdle);
        assert!((transition.next.blend_amount - 0.055).abs() < 1e-6);
        assert!(transition.request.is_some());
    }

    #[test]
    fn kick_recovery_uses_longer_gate() {
        let (clips, _) = test_clips();
        let state = CharacterState {
            phase: Phase::KickIdle,
            blend_amount: 0.0,
            blend_rate: DEFAULT_BLEND_RATE,
        };
        let input = FrameInput::default();

        let snap = AnimatorSnapshot {
            primary_time: 0.9,
            secondary_time: 0.0,
            blend_factor: 0.0,
        };
        assert!(state.step(&input, &snap, &clips).request.is_none());

        let snap = AnimatorSnapshot {
            primary_time: 1.01,
            ..snap
        };
        assert!(state.step(&input, &snap, &clips).request.is_some());
    }

    #[test]
    fn punch_takes_priority_over_kick() {
        let (clips, _) = test_clips();
        let state = CharacterState::new(DEFAULT_BLEND_RATE);
        let input = FrameInput {
            punch: true,
            kick: true,
            ..Default::default()
        };
        let snap = AnimatorSnapshot::default();
        let transition = state.step(&input, &snap, &clips);
        assert_eq!(transition.next.phase, Phase::IdlePunch);
    }

    #[test]
    fn movement_takes_priority_over_actions() {
        let (clips, _) = test_clips();
        let state = CharacterState::new(DEFAULT_BLEND_RATE);
        let input = FrameInput {
            forward: true,
            punch: true,
            kick: true,
            ..Default::default()
        };
        let snap = AnimatorSnapshot::default();
        let transition = state.step(&input, &snap, &clips);
        assert_eq!(transition.next.phase, Phase::IdleWalk);
    }

    #[test]
    fn overshoot_clamps_instead_of_wrapping() {
        let (clips, _) = test_clips();
        // Rate large enough to overshoot 1.0 in one step.
        let state = CharacterState {
            phase: Phase::IdleWalk,
            blend_amount: 0.6,
            blend_rate: 0.6,
        };
        let input = FrameInput {
            forward: true,
            ..Default::default()
        };
        let snap = AnimatorSnapshot::default();
        let transition = state.step(&input, &snap, &clips);
        // 0.6 + 0.6 clamps to 1.0, which is past the commit threshold: the
        // transition finishes instead of silently restarting near zero.
        assert_eq!(transition.next.phase, Phase::Walk);
        assert_eq!(transition.next.blend_amount, 0.0);
    }
}
