use crate::animation::AnimatorSnapshot;
use crate::settings::Settings;

/// Read-only frame data shown in the status window.
pub struct UiStatus<'a> {
    pub phase_name: &'static str,
    pub blend_amount: f32,
    pub snapshot: AnimatorSnapshot,
    pub primary_clip: &'a str,
    pub secondary_clip: Option<&'a str>,
    pub worn_hat: Option<&'static str>,
    /// Kind names of the hats loaded from the asset set.
    pub available_hats: &'a [&'static str],
}

#[derive(Default)]
pub struct UiActions {
    pub reset_camera: bool,
    pub remove_hat: bool,
    pub wear_hat: Option<&'static str>,
}

pub struct Ui;

impl Ui {
    pub fn new() -> Self {
        Self
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        status: &UiStatus,
        settings: &mut Settings,
    ) -> UiActions {
        let mut actions = UiActions::default();

        let mut panel_open = settings.display.show_status_panel;
        egui::Window::new("Animation")
            .default_width(300.0)
            .resizable(true)
            .open(&mut panel_open)
            .show(ctx, |ui| {
                ui.label(format!("State: {}", status.phase_name));

                match status.secondary_clip {
                    Some(secondary) => {
                        ui.label(format!(
                            "Blending {} ({:.2}s) into {} ({:.2}s)",
                            status.primary_clip,
                            status.snapshot.primary_time,
                            secondary,
                            status.snapshot.secondary_time,
                        ));
                    }
                    None => {
                        ui.label(format!(
                            "Playing {} ({:.2}s)",
                            status.primary_clip, status.snapshot.primary_time,
                        ));
                    }
                }
                ui.add(
                    egui::ProgressBar::new(status.blend_amount)
                        .text(format!("blend {:.2}", status.snapshot.blend_factor)),
                );

                ui.separator();

                match status.worn_hat {
                    Some(hat) => {
                        ui.horizontal(|ui| {
                            ui.label(format!("Hat: {hat}"));
                            if ui.button("Remove").clicked() {
                                actions.remove_hat = true;
                            }
                        });
                    }
                    None => {
                        ui.label("Hat: none (walk over one to pick it up)");
                    }
                }
                if !status.available_hats.is_empty() {
                    ui.horizontal(|ui| {
                        for &hat in status.available_hats {
                            if ui.button(hat).clicked() {
                                actions.wear_hat = Some(hat);
                            }
                        }
                    });
                }

                ui.separator();

                let mut changed = false;
                changed |= ui
                    .checkbox(&mut settings.display.show_grid, "Show Grid")
                    .changed();

                ui.label("Far Plane (View Distance):");
                changed |= ui
                    .add(
                        egui::Slider::new(&mut settings.display.far_plane, 20.0..=500.0)
                            .suffix(" units")
                            .logarithmic(true),
                    )
                    .changed();
                if changed {
                    settings.display.save();
                }

                let mut controls_changed = false;
                ui.label("Move Speed:");
                controls_changed |= ui
                    .add(
                        egui::Slider::new(&mut settings.controls.move_speed, 0.5..=10.0)
                            .suffix(" u/s"),
                    )
                    .changed();
                ui.label("Blend Rate (per frame):");
                controls_changed |= ui
                    .add(egui::Slider::new(
                        &mut settings.controls.blend_rate,
                        0.01..=0.25,
                    ))
                    .changed();
                if controls_changed {
                    settings.controls.save();
                }

                ui.separator();

                if ui.button("Reset Camera").clicked() {
                    actions.reset_camera = true;
                }

                ui.separator();
                ui.label("WASD/arrows walk, J punch, K kick");
                ui.label("1-4 force idle/walk/punch/kick, drag orbits, wheel zooms");
            });

        if panel_open != settings.display.show_status_panel {
            settings.display.show_status_panel = panel_open;
            settings.display.save();
        }

        actions
    }
}

impl Default for Ui {
    fn default() -> Self {
        Self::new()
    }
}
