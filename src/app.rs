use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes},
};

use crate::{
    config::{SceneConfig, WindowConfig},
    error::{ContourError, Result},
    gfx::{rendering::RenderEngine, scene::Scene},
};

/// How often the frame rate in the title is refreshed
const FPS_INTERVAL: Duration = Duration::from_secs(2);

/// Window, event loop and renderer around a loaded [`Scene`]
pub struct ContourApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    scene: Scene,
    window_config: WindowConfig,
    shadow_map_size: u32,
    last_frame: Instant,
    frame_counter: FrameCounter,
    failure: Option<ContourError>,
}

impl ContourApp {
    /// Loads every asset of `config`; the window opens in [`ContourApp::run`]
    pub fn new(config: &SceneConfig) -> Result<Self> {
        let event_loop = EventLoop::new()?;

        let window = &config.window;
        let aspect = window.width as f32 / window.height.max(1) as f32;
        let scene = Scene::from_config(config, aspect)?;

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                window: None,
                render_engine: None,
                scene,
                window_config: config.window.clone(),
                shadow_map_size: config.light.shadow_map_size,
                last_frame: Instant::now(),
                frame_counter: FrameCounter::new(Instant::now()),
                failure: None,
            },
        })
    }

    /// Runs until the window closes or Escape is pressed
    pub fn run(mut self) -> Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .ok_or_else(|| ContourError::Gpu("event loop already consumed".to_string()))?;
        event_loop.set_control_flow(ControlFlow::Wait);

        event_loop.run_app(&mut self.app_state)?;

        match self.app_state.failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: ContourError) {
        log::error!("{error}");
        self.failure = Some(error);
        event_loop.exit();
    }

    fn create_renderer(&mut self, window: Arc<Window>) -> Result<RenderEngine> {
        let PhysicalSize { width, height } = window.inner_size();
        let mut renderer = pollster::block_on(RenderEngine::new(
            window,
            width,
            height,
            self.window_config.vsync,
            self.shadow_map_size,
        ))?;
        self.scene
            .camera_manager
            .camera
            .resize_projection(width, height);
        renderer.prepare_scene(&mut self.scene)?;
        log::debug!("Surface format {:?}", renderer.surface_format());
        Ok(renderer)
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
            event_loop.exit();
            return;
        }

        let was_animating = self.scene.camera_manager.is_animating();
        self.scene.camera_manager.process_keyboard_event(event);

        if was_animating != self.scene.camera_manager.is_animating() {
            self.last_frame = Instant::now();
            self.frame_counter = FrameCounter::new(self.last_frame);
            if let Some(window) = &self.window {
                window.set_title(&self.window_config.title);
                window.request_redraw();
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.scene.update(dt);

        let Some(render_engine) = self.render_engine.as_mut() else {
            return;
        };
        render_engine.update(&self.scene);
        if let Err(error) = render_engine.render_frame(&self.scene) {
            self.fail(event_loop, error);
            return;
        }

        if !self.scene.camera_manager.is_animating() {
            return;
        }
        if let Some(window) = &self.window {
            if let Some(fps) = self.frame_counter.tick(now) {
                window.set_title(&format!("{} - {:.1} fps", self.window_config.title, fps));
            }
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.window_config.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.window_config.width,
                self.window_config.height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, ContourError::Gpu(format!("cannot create window: {e}")));
                return;
            }
        };
        self.window = Some(window.clone());

        match self.create_renderer(window.clone()) {
            Ok(renderer) => {
                self.render_engine = Some(renderer);
                self.last_frame = Instant::now();
                window.request_redraw();
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.scene
                    .camera_manager
                    .camera
                    .resize_projection(width, height);
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        if self.scene.camera_manager.process_event(&event) {
            window.request_redraw();
        }
    }
}

/// Counts frames and reports the rate once per [`FPS_INTERVAL`]
struct FrameCounter {
    frames: u32,
    since: Instant,
}

impl FrameCounter {
    fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            since: now,
        }
    }

    /// Records a frame; returns frames per second when an interval has passed
    fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.duration_since(self.since);
        if elapsed < FPS_INTERVAL {
            return None;
        }

        let fps = self.frames as f32 / elapsed.as_secs_f32();
        *self = Self::new(now);
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_counter_reports_every_interval() {
        let start = Instant::now();
        let mut counter = FrameCounter::new(start);

        for i in 1..60 {
            assert!(counter.tick(start + Duration::from_millis(i * 30)).is_none());
        }
        let fps = counter.tick(start + FPS_INTERVAL).unwrap();
        assert!((fps - 30.0).abs() < 1e-3, "got {fps}");

        // Counting restarts after a report
        assert!(counter.tick(start + FPS_INTERVAL + Duration::from_millis(10)).is_none());
        assert_eq!(counter.frames, 1);
    }
}
