use nalgebra_glm as glm;
use winit::keyboard::{Key, NamedKey};

/// Held-key state, updated from winit keyboard events.
#[derive(Debug, Default)]
pub struct InputState {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    punch: bool,
    kick: bool,
    select_idle: bool,
    select_walk: bool,
    select_punch: bool,
    select_kick: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_keyboard_event(&mut self, event: &winit::event::KeyEvent) {
        let pressed = event.state == winit::event::ElementState::Pressed;
        match &event.logical_key {
            Key::Character(c) => match c.to_lowercase().as_str() {
                "w" => self.forward = pressed,
                "s" => self.back = pressed,
                "a" => self.left = pressed,
                "d" => self.right = pressed,
                "j" => self.punch = pressed,
                "k" => self.kick = pressed,
                "1" => self.select_idle = pressed,
                "2" => self.select_walk = pressed,
                "3" => self.select_punch = pressed,
                "4" => self.select_kick = pressed,
                _ => {}
            },
            Key::Named(NamedKey::ArrowUp) => self.forward = pressed,
            Key::Named(NamedKey::ArrowDown) => self.back = pressed,
            Key::Named(NamedKey::ArrowLeft) => self.left = pressed,
            Key::Named(NamedKey::ArrowRight) => self.right = pressed,
            _ => {}
        }
    }

    /// Per-frame immutable snapshot consumed by the state machine and the scene.
    pub fn snapshot(&self) -> FrameInput {
        FrameInput {
            forward: self.forward,
            back: self.back,
            left: self.left,
            right: self.right,
            punch: self.punch,
            kick: self.kick,
            select_idle: self.select_idle,
            select_walk: self.select_walk,
            select_punch: self.select_punch,
            select_kick: self.select_kick,
        }
    }
}

/// One frame's worth of logical input, snapshot before any core logic runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub punch: bool,
    pub kick: bool,
    pub select_idle: bool,
    pub select_walk: bool,
    pub select_punch: bool,
    pub select_kick: bool,
}

impl FrameInput {
    pub fn any_movement(&self) -> bool {
        self.forward || self.back || self.left || self.right
    }

    /// Normalized movement direction on the ground plane, if any key is held.
    pub fn move_dir(&self) -> Option<glm::Vec3> {
        let mut dir = glm::vec3(0.0, 0.0, 0.0);
        if self.forward {
            dir += glm::vec3(0.0, 0.0, -1.0);
        }
        if self.back {
            dir += glm::vec3(0.0, 0.0, 1.0);
        }
        if self.left {
            dir += glm::vec3(-1.0, 0.0, 0.0);
        }
        if self.right {
            dir += glm::vec3(1.0, 0.0, 0.0);
        }
        if glm::length(&dir) > 0.0 {
            Some(glm::normalize(&dir))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_keys_cancel_out() {
        let input = FrameInput {
            forward: true,
            back: true,
            ..Default::default()
        };
        assert!(input.any_movement());
        assert!(input.move_dir().is_none());
    }

    #[test]
    fn diagonal_is_normalized() {
        let input = FrameInput {
            forward: true,
            right: true,
            ..Default::default()
        };
        let dir = input.move_dir().unwrap();
        assert!((glm::length(&dir) - 1.0).abs() < 1e-6);
    }
}
