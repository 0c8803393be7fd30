//! Windowed front end: winit event handling around a [`SceneComposer`] and
//! a [`Renderer`].

use std::sync::Arc;

use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Fullscreen, Window, WindowId};

use crate::error::AppError;
use crate::events::SceneEvent;
use crate::gpu::Renderer;
use crate::input::{Input, InputAction};
use crate::quality::PerformanceMonitor;
use crate::scene::SceneComposer;
use crate::time::Time;

const TITLE: &str = "Yuletide";

pub struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    scene: Option<SceneComposer>,
    input: Input,
    time: Time,
    /// Last music state reported, to log only changes.
    playing: Option<(&'static str, f32)>,
    error: Option<AppError>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            window: None,
            renderer: None,
            scene: None,
            input: Input::new(),
            time: Time::new(),
            playing: None,
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let size = window.inner_size();
        let mut scene =
            SceneComposer::new(Vec2::new(size.width.max(1) as f32, size.height.max(1) as f32))?;
        let refresh_rate = window
            .current_monitor()
            .and_then(|m| m.refresh_rate_millihertz())
            .map(|mhz| mhz as f32 / 1000.0);
        scene.set_performance_monitor(Some(PerformanceMonitor::new(refresh_rate)));

        let renderer = pollster::block_on(Renderer::new(window.clone()))?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.scene = Some(scene);
        self.time = Time::new();
        Ok(())
    }

    fn handle_action(&mut self, event_loop: &ActiveEventLoop, action: InputAction) {
        match action {
            InputAction::Scene(event) => {
                if let Some(scene) = &mut self.scene {
                    scene.push_event(event);
                }
            }
            InputAction::Orbit(delta) => {
                if let Some(scene) = &mut self.scene {
                    scene.camera_mut().orbit(delta);
                }
            }
            InputAction::ToggleFullscreen => {
                if let Some(window) = &self.window {
                    let next = match window.fullscreen() {
                        Some(_) => None,
                        None => Some(Fullscreen::Borderless(None)),
                    };
                    window.set_fullscreen(next);
                }
            }
            InputAction::Exit => event_loop.exit(),
        }
    }

    fn report_music(&mut self) {
        let Some(scene) = &self.scene else {
            return;
        };
        let now = scene.music().map(|(track, volume)| (track.title, volume));
        if now != self.playing {
            match scene.music() {
                Some((track, volume)) => log::info!(
                    "music: {} by {} ({}) at volume {volume:.1}",
                    track.title,
                    track.artist,
                    track.file
                ),
                None => log::info!("music off"),
            }
            self.playing = now;
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let dt = self.time.update();
        let (Some(scene), Some(renderer)) = (&mut self.scene, &mut self.renderer) else {
            return;
        };

        if let Err(e) = scene.frame(dt) {
            self.fail(event_loop, e.into());
            return;
        }

        match renderer.render(scene) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = renderer.size();
                renderer.resize(width, height);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("render error: {e:?}"),
        }

        self.report_music();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(action) = self.input.handle_event(&event) {
            self.handle_action(event_loop, action);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                }
                if size.width > 0 && size.height > 0 {
                    if let Some(scene) = &mut self.scene {
                        scene.push_event(SceneEvent::Resized {
                            width: size.width as f32,
                            height: size.height as f32,
                        });
                    }
                }
            }
            WindowEvent::Occluded(occluded) => {
                if occluded {
                    self.time.pause();
                } else {
                    self.time.resume();
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
