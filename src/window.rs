use std::sync::Arc;

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    window::Window,
};

use crate::rendering::renderer::Renderer;
use crate::viewer::Viewer;

// One wheel "line" in pixel-equivalent units, matching typical browsers.
const WHEEL_LINE_PIXELS: f32 = 40.0;

struct App {
    viewer: Viewer,
    renderer: Option<Renderer>,
    model_url: String,
    cursor: (f32, f32),
}

impl App {
    fn new(viewer: Viewer, model_url: String) -> Self {
        Self {
            viewer,
            renderer: None,
            model_url,
            cursor: (0.0, 0.0),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        let window_attributes = Window::default_attributes().with_title("Try-on viewer");
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(Renderer::new(window)) {
            Ok(renderer) => {
                self.viewer
                    .controls
                    .set_viewport_height(renderer.size.height as f32);
                self.renderer = Some(renderer);
            }
            Err(err) => {
                // Resource errors are fatal: no renderer, no session.
                log::error!("renderer initialization failed: {err:#}");
                event_loop.exit();
                return;
            }
        }

        self.viewer.load_model(&self.model_url);
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                renderer.resize(new_size);
                self.viewer
                    .controls
                    .set_viewport_height(new_size.height as f32);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                self.viewer.controls.pointer_move(self.cursor.0, self.cursor.1);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    self.viewer.controls.pointer_down(self.cursor.0, self.cursor.1);
                }
                ElementState::Released => {
                    self.viewer.controls.pointer_up();
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * WHEEL_LINE_PIXELS,
                    MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                };
                self.viewer.controls.wheel(delta_y);
            }
            WindowEvent::RedrawRequested => {
                renderer.window.request_redraw();

                if let Some(released) = self.viewer.poll_finished_load() {
                    renderer.release_geometries(&released);
                }

                self.viewer.update();

                match renderer.render(
                    &self.viewer.scene,
                    &self.viewer.camera,
                    self.viewer.camera_node(),
                ) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        renderer.resize(renderer.size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("out of GPU memory");
                        event_loop.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        log::warn!("surface timeout");
                    }
                    Err(other) => {
                        log::error!("unexpected surface error: {other:?}");
                    }
                }
            }
            _ => (),
        }
    }
}

pub async fn run(model_url: String) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let viewer = Viewer::new().context("Failed to create viewer")?;
    let mut app = App::new(viewer, model_url);
    event_loop.run_app(&mut app)?;

    Ok(())
}
