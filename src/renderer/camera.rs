use nalgebra_glm as glm;

/// Orbit camera around the character. Mouse input moves the target angles
/// instantly; the rendered angles chase them with exponential smoothing.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub target_yaw: f32,
    pub target_pitch: f32,
    default_radius: f32,
    default_yaw: f32,
    default_pitch: f32,
}

/// View target sits this far above the character's feet.
const FOCUS_HEIGHT: f32 = 1.0;

impl OrbitCamera {
    pub fn new(radius: f32, yaw_deg: f32, pitch_deg: f32) -> Self {
        Self {
            radius,
            yaw: yaw_deg,
            pitch: pitch_deg,
            target_yaw: yaw_deg,
            target_pitch: pitch_deg,
            default_radius: radius,
            default_yaw: yaw_deg,
            default_pitch: pitch_deg,
        }
    }

    pub fn rotate(&mut self, delta_x: f32, delta_y: f32, sensitivity: f32) {
        self.target_yaw -= delta_x * sensitivity;
        self.target_pitch -= delta_y * sensitivity;
        self.target_pitch = self.target_pitch.clamp(-89.0, 89.0);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.radius = (self.radius - delta).clamp(2.0, 50.0);
    }

    /// Chase the target angles: factor `1 - exp(-speed * dt)` so smoothing is
    /// framerate independent.
    pub fn update(&mut self, smooth_speed: f32, dt: f32) {
        let factor = 1.0 - (-smooth_speed * dt).exp();
        self.yaw += (self.target_yaw - self.yaw) * factor;
        self.pitch += (self.target_pitch - self.pitch) * factor;
    }

    pub fn eye(&self, focus: &glm::Vec3) -> glm::Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        focus
            + glm::vec3(
                self.radius * pitch.cos() * yaw.sin(),
                self.radius * pitch.sin(),
                self.radius * pitch.cos() * yaw.cos(),
            )
    }

    pub fn view_matrix(&self, character_position: &glm::Vec3) -> glm::Mat4 {
        let focus = character_position + glm::vec3(0.0, FOCUS_HEIGHT, 0.0);
        let eye = self.eye(&focus);
        glm::look_at(&eye, &focus, &glm::vec3(0.0, 1.0, 0.0))
    }

    pub fn reset(&mut self) {
        self.radius = self.default_radius;
        self.yaw = self.default_yaw;
        self.pitch = self.default_pitch;
        self.target_yaw = self.default_yaw;
        self.target_pitch = self.default_pitch;
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(10.0, 0.0, 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.rotate(0.0, -10000.0, 0.1);
        assert_eq!(camera.target_pitch, 89.0);
        camera.rotate(0.0, 10000.0, 0.1);
        assert_eq!(camera.target_pitch, -89.0);
    }

    #[test]
    fn smoothing_converges_to_target() {
        let mut camera = OrbitCamera::default();
        camera.rotate(100.0, 0.0, 0.1);
        for _ in 0..600 {
            camera.update(8.0, 0.016);
        }
        assert!((camera.yaw - camera.target_yaw).abs() < 0.01);
    }
}
