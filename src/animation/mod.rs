// Animation core: clip sampling, pose blending, hierarchy resolution,
// the animation driver and the locomotion/action state machine.

pub mod animator;
pub mod blend;
pub mod sampler;
pub mod skeleton;
pub mod state_machine;
pub mod types;

pub use animator::*;
pub use state_machine::*;
pub use types::*;
