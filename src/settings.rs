use crate::CONFY_APP_NAME;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub show_grid: bool,
    pub show_status_panel: bool,
    pub far_plane: f32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_grid: true,
            show_status_panel: true,
            far_plane: 100.0,
        }
    }
}

impl DisplaySettings {
    pub fn load() -> Self {
        confy::load(CONFY_APP_NAME, "display").unwrap_or_default()
    }

    pub fn save(&self) {
        let _ = confy::store(CONFY_APP_NAME, "display", self);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSettings {
    pub move_speed: f32,
    /// Cross-fade accumulator progress per frame.
    pub blend_rate: f32,
    pub mouse_sensitivity: f32,
    pub camera_smoothing: f32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            move_speed: 2.5,
            blend_rate: crate::animation::DEFAULT_BLEND_RATE,
            mouse_sensitivity: 0.1,
            camera_smoothing: 8.0,
        }
    }
}

impl ControlSettings {
    pub fn load() -> Self {
        confy::load(CONFY_APP_NAME, "controls").unwrap_or_default()
    }

    pub fn save(&self) {
        let _ = confy::store(CONFY_APP_NAME, "controls", self);
    }
}

// Aggregate struct for convenience
pub struct Settings {
    pub display: DisplaySettings,
    pub controls: ControlSettings,
}

impl Settings {
    pub fn load() -> Self {
        Self {
            display: DisplaySettings::load(),
            controls: ControlSettings::load(),
        }
    }

    pub fn save(&self) {
        self.display.save();
        self.controls.save();
    }
}
