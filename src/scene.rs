// World-side state: character locomotion, hat pickups, hat attachment math.

use nalgebra_glm as glm;

use crate::input::FrameInput;
use crate::model::HatDoc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HatKind {
    Ghost,
    Slime,
    Mario,
}

impl HatKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ghost" => Some(HatKind::Ghost),
            "slime" => Some(HatKind::Slime),
            "mario" => Some(HatKind::Mario),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HatKind::Ghost => "ghost",
            HatKind::Slime => "slime",
            HatKind::Mario => "mario",
        }
    }
}

/// Runtime hat: attachment constants plus the world pickup sphere.
#[derive(Debug, Clone)]
pub struct Hat {
    pub name: String,
    pub kind: HatKind,
    pub scale: f32,
    pub offset: glm::Vec3,
    pub pickup_position: glm::Vec3,
    pub pickup_radius: f32,
}

impl Hat {
    pub fn from_doc(doc: &HatDoc) -> Option<Self> {
        let kind = HatKind::parse(&doc.kind)?;
        Some(Self {
            name: doc.name.clone(),
            kind,
            scale: doc.scale,
            offset: glm::vec3(doc.offset[0], doc.offset[1], doc.offset[2]),
            pickup_position: glm::vec3(
                doc.pickup_position[0],
                doc.pickup_position[1],
                doc.pickup_position[2],
            ),
            pickup_radius: doc.pickup_radius,
        })
    }
}

/// Character position and facing on the ground plane.
pub struct Character {
    pub position: glm::Vec3,
    pub front: glm::Vec3,
    front_target: glm::Vec3,
}

/// Per-frame easing of the facing direction toward the movement direction.
const FACING_EASE: f32 = 0.1;

impl Character {
    pub fn new() -> Self {
        Self {
            position: glm::vec3(0.0, 0.0, 0.0),
            front: glm::vec3(0.0, 0.0, -1.0),
            front_target: glm::vec3(0.0, 0.0, -1.0),
        }
    }

    pub fn update(&mut self, input: &FrameInput, speed: f32, dt: f32) {
        if let Some(dir) = input.move_dir() {
            self.position += dir * speed * dt;
            self.front_target = dir;
        }
        self.front = glm::lerp(&self.front, &self.front_target, FACING_EASE);
    }

    /// Yaw so the model faces its movement direction.
    pub fn model_matrix(&self) -> glm::Mat4 {
        let mut model = glm::translation(&self.position);
        if glm::length(&self.front) > 0.0 {
            let angle = self.front.x.atan2(self.front.z);
            model = glm::rotate(&model, angle, &glm::vec3(0.0, 1.0, 0.0));
        }
        model
    }
}

impl Default for Character {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk-over pickup check: the first hat whose pickup sphere contains the
/// character replaces the worn one.
pub fn check_pickups(character: &Character, hats: &[Hat], worn: Option<HatKind>) -> Option<HatKind> {
    for hat in hats {
        let distance = glm::length(&(character.position - hat.pickup_position));
        if distance < hat.pickup_radius {
            if worn != Some(hat.kind) {
                log::info!("picked up hat: {}", hat.name);
            }
            return Some(hat.kind);
        }
    }
    worn
}

/// World transform of a worn hat: character model matrix, the head bone's
/// model-space transform, then the hat's own scale and offset.
pub fn hat_attachment_matrix(
    character_model: &glm::Mat4,
    head_global: &glm::Mat4,
    hat: &Hat,
) -> glm::Mat4 {
    let mut m = character_model * head_global;
    m = glm::scale(&m, &glm::vec3(hat.scale, hat.scale, hat.scale));
    m = glm::translate(&m, &hat.offset);
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_hat(kind: HatKind, at: glm::Vec3) -> Hat {
        Hat {
            name: kind.name().to_string(),
            kind,
            scale: 1.0,
            offset: glm::vec3(0.0, 0.0, 0.0),
            pickup_position: at,
            pickup_radius: 0.5,
        }
    }

    #[test]
    fn walking_into_pickup_equips_hat() {
        let mut character = Character::new();
        character.position = glm::vec3(1.0, 0.0, -3.0);
        let hats = vec![
            test_hat(HatKind::Ghost, glm::vec3(1.0, 0.2, -3.0)),
            test_hat(HatKind::Slime, glm::vec3(-1.0, 0.2, -3.0)),
        ];
        assert_eq!(check_pickups(&character, &hats, None), Some(HatKind::Ghost));
    }

    #[test]
    fn out_of_range_keeps_current_hat() {
        let character = Character::new();
        let hats = vec![test_hat(HatKind::Mario, glm::vec3(-3.0, 0.2, -3.0))];
        assert_eq!(
            check_pickups(&character, &hats, Some(HatKind::Slime)),
            Some(HatKind::Slime)
        );
    }

    #[test]
    fn movement_moves_and_turns_the_character() {
        let mut character = Character::new();
        let input = FrameInput {
            right: true,
            ..Default::default()
        };
        for _ in 0..60 {
            character.update(&input, 2.5, 0.016);
        }
        assert!(character.position.x > 1.0);
        // facing eases toward +x
        assert!(character.front.x > 0.9);
    }
}
