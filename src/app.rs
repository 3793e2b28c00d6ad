use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use nalgebra_glm as glm;
use winit::window::Window;

use crate::animation::{Animator, AnimatorSnapshot, BlendRequest, CharacterState, Clip, ClipSet};
use crate::error::ViewerError;
use crate::input::{FrameInput, InputState};
use crate::renderer::{OrbitCamera, Renderer, SceneFrame};
use crate::scene::{check_pickups, hat_attachment_matrix, Character, Hat, HatKind};
use crate::settings::Settings;
use crate::ui::{Ui, UiStatus};

pub struct App {
    pub window: Arc<Window>,
    ui: Ui,
    renderer: Renderer,
    egui_state: egui_winit::State,
    settings: Settings,
    input: InputState,
    prev_input: FrameInput,
    clips: ClipSet,
    animator: Animator,
    char_state: CharacterState,
    last_snapshot: AnimatorSnapshot,
    character: Character,
    hats: Vec<Hat>,
    worn_hat: Option<HatKind>,
    attach_bone: String,
    camera: OrbitCamera,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    last_frame: Instant,
}

pub struct EventResponse {
    pub repaint: bool,
    pub exit: bool,
}

impl App {
    pub async fn new(window: Arc<Window>, character_path: PathBuf) -> Result<Self, ViewerError> {
        let ui = Ui::new();
        let settings = Settings::load();

        let mut renderer = Renderer::new(&window).await?;

        let egui_ctx = renderer.egui_context();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::viewport::ViewportId::ROOT,
            &*window,
            None,
            None,
            None,
        );

        let assets = crate::parser::load_assets(&character_path)?;
        let asset_dir = character_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        renderer.upload_character(&assets.character.mesh, &asset_dir)?;

        let mut hats = Vec::new();
        for doc in &assets.hats.hats {
            let Some(hat) = Hat::from_doc(doc) else {
                log::warn!("unknown hat kind '{}', skipping '{}'", doc.kind, doc.name);
                continue;
            };
            let mesh = crate::parser::load_mesh_data(&asset_dir.join(&doc.mesh))?;
            renderer.upload_hat(hat.kind, &mesh, &asset_dir)?;
            hats.push(hat);
        }

        let animator = Animator::new(assets.skeleton.clone(), assets.clips.idle.clone());
        let last_snapshot = animator.snapshot();
        let char_state = CharacterState::new(settings.controls.blend_rate);

        Ok(Self {
            window,
            ui,
            renderer,
            egui_state,
            settings,
            input: InputState::new(),
            prev_input: FrameInput::default(),
            clips: assets.clips,
            animator,
            char_state,
            last_snapshot,
            character: Character::new(),
            hats,
            worn_hat: None,
            attach_bone: assets.character.attach_bone.clone(),
            camera: OrbitCamera::default(),
            mouse_pressed: false,
            last_mouse_pos: None,
            last_frame: Instant::now(),
        })
    }

    pub fn handle_event(&mut self, event: &winit::event::WindowEvent) -> EventResponse {
        let egui_response = self.egui_state.on_window_event(&self.window, event);
        if egui_response.consumed {
            return EventResponse {
                repaint: egui_response.repaint,
                exit: false,
            };
        }

        match event {
            winit::event::WindowEvent::CloseRequested => {
                self.settings.save();
                return EventResponse {
                    repaint: false,
                    exit: true,
                };
            }
            winit::event::WindowEvent::KeyboardInput { event, .. } => {
                if event.logical_key
                    == winit::keyboard::Key::Named(winit::keyboard::NamedKey::Escape)
                {
                    self.settings.save();
                    return EventResponse {
                        repaint: false,
                        exit: true,
                    };
                }
                self.input.on_keyboard_event(event);
            }
            winit::event::WindowEvent::Resized(size) => {
                self.renderer.resize(*size);
            }
            winit::event::WindowEvent::MouseInput { state, button, .. } => {
                if *button == winit::event::MouseButton::Left {
                    self.mouse_pressed = *state == winit::event::ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            winit::event::WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some(last_pos) = self.last_mouse_pos {
                        let delta_x = (position.x - last_pos.0) as f32;
                        let delta_y = (position.y - last_pos.1) as f32;
                        self.camera.rotate(
                            delta_x,
                            delta_y,
                            self.settings.controls.mouse_sensitivity,
                        );
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            winit::event::WindowEvent::MouseWheel { delta, .. } => {
                let scroll_delta = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => *y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.camera.zoom(scroll_delta);
            }
            _ => {}
        }

        EventResponse {
            repaint: false,
            exit: false,
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        // Clamp pauses (window drag, debugger) so the simulation never jumps.
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;

        let input = self.input.snapshot();

        // Fixed per-frame order: step the machine against last frame's
        // snapshot, apply its request, then any direct override, then advance.
        self.char_state.blend_rate = self.settings.controls.blend_rate;
        let transition = self.char_state.step(&input, &self.last_snapshot, &self.clips);
        self.char_state = transition.next;
        if let Some(request) = transition.request {
            self.animator.play_animation(request);
        }
        if let Some(request) = clip_override(&input, &self.prev_input, &self.clips) {
            self.animator.play_animation(request);
        }
        self.last_snapshot = self.animator.update_animation(dt);
        self.prev_input = input;

        self.character
            .update(&input, self.settings.controls.move_speed, dt);
        self.worn_hat = check_pickups(&self.character, &self.hats, self.worn_hat);
        self.camera
            .update(self.settings.controls.camera_smoothing, dt);

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let egui_ctx = self.renderer.egui_context();

        let primary_name = self.animator.primary_clip().name.clone();
        let secondary_name = self.animator.secondary_clip().map(|c| c.name.clone());
        let available_hats: Vec<&'static str> = self.hats.iter().map(|h| h.kind.name()).collect();
        let status = UiStatus {
            phase_name: self.char_state.phase.name(),
            blend_amount: self.char_state.blend_amount,
            snapshot: self.last_snapshot,
            primary_clip: &primary_name,
            secondary_clip: secondary_name.as_deref(),
            worn_hat: self.worn_hat.map(|k| k.name()),
            available_hats: &available_hats,
        };
        let mut actions = crate::ui::UiActions::default();
        let full_output = egui_ctx.run(raw_input, |ctx| {
            actions = self.ui.show(ctx, &status, &mut self.settings);
        });

        if actions.reset_camera {
            self.camera.reset();
        }
        if actions.remove_hat {
            self.worn_hat = None;
        }
        if let Some(name) = actions.wear_hat {
            self.worn_hat = HatKind::parse(name);
        }

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);
        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.window.inner_size().width,
                self.window.inner_size().height,
            ],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let character_model = self.character.model_matrix();
        let worn_hat = self.worn_hat.and_then(|kind| {
            let hat = self.hats.iter().find(|h| h.kind == kind)?;
            let head = self.animator.bone_global_transform(&self.attach_bone);
            Some((kind, hat_attachment_matrix(&character_model, &head, hat)))
        });
        let prop_hats: Vec<(HatKind, glm::Mat4)> = self
            .hats
            .iter()
            .map(|hat| {
                let model = glm::scale(
                    &glm::translation(&hat.pickup_position),
                    &glm::vec3(hat.scale, hat.scale, hat.scale),
                );
                (hat.kind, model)
            })
            .collect();

        let frame = SceneFrame {
            view: self.camera.view_matrix(&self.character.position),
            far_plane: self.settings.display.far_plane,
            show_grid: self.settings.display.show_grid,
            character_model,
            bone_matrices: self.animator.final_bone_matrices(),
            worn_hat,
            prop_hats: &prop_hats,
        };

        self.renderer
            .render(&frame, paint_jobs, full_output.textures_delta, screen_descriptor)
    }
}

/// Direct clip selection with the number keys, edge-triggered on the press.
/// Bypasses the state machine on purpose, so the on-screen state can disagree
/// with what plays until the next transition.
fn clip_override(
    input: &FrameInput,
    prev: &FrameInput,
    clips: &ClipSet,
) -> Option<BlendRequest> {
    let pick = |held: bool, was_held: bool, clip: &Arc<Clip>| {
        if held && !was_held {
            Some(BlendRequest::single(clip.clone(), 0.0))
        } else {
            None
        }
    };
    pick(input.select_idle, prev.select_idle, &clips.idle)
        .or_else(|| pick(input.select_walk, prev.select_walk, &clips.walk))
        .or_else(|| pick(input.select_punch, prev.select_punch, &clips.punch))
        .or_else(|| pick(input.select_kick, prev.select_kick, &clips.kick))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::types::test_fixtures::{ramp_clip, test_skeleton};

    fn test_clips() -> ClipSet {
        let skeleton = test_skeleton();
        ClipSet {
            idle: ramp_clip("idle", 3.3, 1.0, &skeleton),
            walk: ramp_clip("walk", 2.06, 1.0, &skeleton),
            punch: ramp_clip("punch", 1.03, 1.0, &skeleton),
            kick: ramp_clip("kick", 1.6, 1.0, &skeleton),
        }
    }

    #[test]
    fn fresh_press_selects_the_clip_from_zero() {
        let clips = test_clips();
        let input = FrameInput {
            select_walk: true,
            ..Default::default()
        };
        let request = clip_override(&input, &FrameInput::default(), &clips).unwrap();
        assert_eq!(request.primary.name, "walk");
        assert!(request.secondary.is_none());
        assert_eq!(request.primary_start, 0.0);
    }

    #[test]
    fn held_key_does_not_reissue() {
        let clips = test_clips();
        let input = FrameInput {
            select_punch: true,
            ..Default::default()
        };
        // Same key held across frames: only the press edge fires.
        assert!(clip_override(&input, &input, &clips).is_none());
    }

    #[test]
    fn lowest_numbered_key_wins() {
        let clips = test_clips();
        let input = FrameInput {
            select_idle: true,
            select_kick: true,
            ..Default::default()
        };
        let request = clip_override(&input, &FrameInput::default(), &clips).unwrap();
        assert_eq!(request.primary.name, "idle");
    }
}
