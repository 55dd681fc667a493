use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::{Window, WindowId};

use crate::atlas::{Atlas, AtlasBuildError, AtlasJob};
use crate::device::GpuInit;
use crate::engine::{ParticleEngine, ParticlesConfig};
use crate::input::platform::translate_window_event;
use crate::input::InputEvent;
use crate::render::ParticleRenderer;

use super::{RedrawScheduler, WindowHost};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Let the desktop show through wherever no particle is drawn.
    pub transparent: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "glimmer".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            transparent: true,
        }
    }
}

/// Events posted to the event loop from worker threads.
#[derive(Debug)]
pub enum RuntimeEvent {
    AtlasReady(Result<Atlas, AtlasBuildError>),
}

type Engine = ParticleEngine<ParticleRenderer, RedrawScheduler>;

/// Entry point for the runtime: one window hosting one particle field.
pub struct Runtime;

impl Runtime {
    pub fn run(initial: RuntimeConfig, gpu_init: GpuInit, particles: ParticlesConfig) -> Result<()> {
        let event_loop = EventLoop::<RuntimeEvent>::with_user_event()
            .build()
            .context("failed to create winit EventLoop")?;
        let proxy = event_loop.create_proxy();
        let mut state = AppState::new(initial, gpu_init, particles, proxy);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

struct AppState {
    initial: RuntimeConfig,
    gpu_init: GpuInit,
    particles: ParticlesConfig,
    proxy: EventLoopProxy<RuntimeEvent>,

    window: Option<Arc<Window>>,
    engine: Option<Engine>,
    exit_requested: bool,
}

impl AppState {
    fn new(
        initial: RuntimeConfig,
        gpu_init: GpuInit,
        particles: ParticlesConfig,
        proxy: EventLoopProxy<RuntimeEvent>,
    ) -> Self {
        Self {
            initial,
            gpu_init,
            particles,
            proxy,
            window: None,
            engine: None,
            exit_requested: false,
        }
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>> {
        let attrs = Window::default_attributes()
            .with_title(self.initial.title.clone())
            .with_inner_size(self.initial.initial_size)
            .with_transparent(self.initial.transparent);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        Ok(Arc::new(window))
    }

    /// Mounts the particle field. A mount failure leaves the window open and
    /// empty; the field is decorative.
    fn mount(&mut self, window: Arc<Window>) {
        let gpu_init = self.gpu_init.clone();
        let backend_window = window.clone();

        let mounted = Engine::mount(
            Box::new(WindowHost(window.clone())),
            self.particles.clone(),
            move || ParticleRenderer::new(backend_window, gpu_init),
            RedrawScheduler::new(window),
        );

        match mounted {
            Ok((engine, job)) => {
                self.engine = Some(engine);
                if let Some(job) = job {
                    self.spawn_atlas(job);
                }
            }
            Err(e) => log::error!("running without particles: {e}"),
        }
    }

    /// Builds the atlas on a worker thread and posts the result back.
    fn spawn_atlas(&mut self, job: AtlasJob) {
        let proxy = self.proxy.clone();
        let worker_job = job.clone();
        let spawned = std::thread::Builder::new()
            .name("glimmer-atlas".to_string())
            .spawn(move || {
                let result = worker_job.run_blocking();
                if proxy.send_event(RuntimeEvent::AtlasReady(result)).is_err() {
                    log::debug!("event loop closed before the atlas was ready");
                }
            });

        if let Err(e) = spawned {
            log::warn!("failed to spawn atlas worker ({e}); building on the event loop");
            if let Some(engine) = self.engine.as_mut() {
                engine.finish_atlas(job.run_blocking());
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.dispose();
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.teardown();
        self.exit_requested = true;
        event_loop.exit();
    }
}

impl ApplicationHandler<RuntimeEvent> for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match self.create_window(event_loop) {
            Ok(window) => {
                self.window = Some(window.clone());
                self.mount(window);
            }
            Err(e) => {
                log::error!("failed to create initial window: {e:#}");
                self.request_exit(event_loop);
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: RuntimeEvent) {
        match event {
            RuntimeEvent::AtlasReady(result) => match self.engine.as_mut() {
                Some(engine) => engine.finish_atlas(result),
                None => log::debug!("atlas result discarded: no particle field"),
            },
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Frames are driven by the engine's own redraw requests.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else { return };
        if window.id() != window_id {
            return;
        }

        if let WindowEvent::CloseRequested = event {
            self.request_exit(event_loop);
            return;
        }

        let translated = translate_window_event(window, &event);
        let Some(engine) = self.engine.as_mut() else { return };

        match (translated, &event) {
            (Some(InputEvent::Resized { .. }), _) => {
                if engine.listeners().resize {
                    engine.on_resize();
                }
            }
            (Some(InputEvent::PointerMoved(p)), _) => {
                if engine.listeners().pointer {
                    engine.on_pointer_moved(p.x, p.y);
                }
            }
            (_, WindowEvent::RedrawRequested) => {
                if let Some(request) = engine.scheduler_mut().take_due() {
                    engine.on_frame(request, Instant::now());
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}
