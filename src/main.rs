use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

mod animation;
mod app;
mod error;
mod input;
mod model;
mod parser;
mod renderer;
mod scene;
mod settings;
mod texture_loader;
mod ui;

/// Application name used for the on-disk settings location.
pub const CONFY_APP_NAME: &str = "animvis-rs";

struct AppHandler {
    app: Option<app::App>,
    character_path: PathBuf,
}

impl ApplicationHandler for AppHandler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_none() {
            let window_attrs = Window::default_attributes()
                .with_title("AnimVis - Character Animation Viewer")
                .with_inner_size(winit::dpi::LogicalSize::new(1200.0, 800.0));

            let window = match event_loop.create_window(window_attrs) {
                Ok(window) => Arc::new(window),
                Err(e) => {
                    log::error!("failed to create window: {e}");
                    event_loop.exit();
                    return;
                }
            };

            match pollster::block_on(app::App::new(window, self.character_path.clone())) {
                Ok(app) => self.app = Some(app),
                Err(e) => {
                    log::error!("failed to start: {e}");
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let Some(app) = &mut self.app {
            let response = app.handle_event(&event);
            if response.repaint {
                app.window.request_redraw();
            }
            if response.exit {
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(app) = &mut self.app {
            if let Err(e) = app.render() {
                log::error!("render error: {e:?}");
            }
            app.window.request_redraw();
        }
    }
}

fn main() -> Result<(), error::ViewerError> {
    env_logger::init();

    let character_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets/character.json"));

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut handler = AppHandler {
        app: None,
        character_path,
    };
    event_loop.run_app(&mut handler)?;
    Ok(())
}
