mod character;
mod clip;
mod mesh;
mod skeleton;

pub use character::*;
pub use clip::*;
pub use mesh::*;
pub use skeleton::*;
