use std::sync::Arc;
use std::time::Instant;

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::atlas::{
    Atlas, AtlasBuildError, AtlasJob, FileIconLoader, GlowGlyphs, GlyphSynth, UvRect, dot_texture,
};
use crate::coords::Viewport;
use crate::field::generate;
use crate::render::{Camera, ParticleBackend, ParticleUniforms, RenderStatus, TextureHandle};
use crate::time::FrameClock;

use super::animation::{LoopState, Motion, MotionParams};
use super::{ConfigError, FrameRequest, FrameScheduler, Host, ParticlesConfig};

/// Fatal failure while mounting. Nothing stays attached to the host.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("invalid particle configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("GPU context unavailable: {0:#}")]
    ContextCreation(anyhow::Error),
}

/// Host events the engine currently listens to.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Listeners {
    pub resize: bool,
    pub pointer: bool,
}

impl Listeners {
    pub const NONE: Self = Self { resize: false, pointer: false };

    #[inline]
    pub fn any(self) -> bool {
        self.resize || self.pointer
    }
}

/// Coarse lifecycle of a mounted engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Mounted, waiting for the atlas; nothing uploaded yet.
    Pending,
    /// Field uploaded and frame loop started.
    Live,
    Disposed,
}

/// One particle field mounted into one host.
///
/// Owns the backend exclusively. The sequence is mount, then field upload
/// (immediately, or once the atlas arrives through
/// [`finish_atlas`](Self::finish_atlas)), then frame ticks until
/// [`dispose`](Self::dispose).
pub struct ParticleEngine<B: ParticleBackend, S: FrameScheduler> {
    host: Box<dyn Host>,
    config: ParticlesConfig,
    backend: B,
    scheduler: S,

    camera: Camera,
    uniforms: ParticleUniforms,
    motion: Motion,
    clock: FrameClock,

    /// Last pointer position in NDC; written by the listener, read per frame.
    pointer: Vec2,

    listeners: Listeners,
    state: LoopState,
    phase: Phase,
}

impl<B: ParticleBackend, S: FrameScheduler> ParticleEngine<B, S> {
    /// Creates the backend, sizes it to the host and registers listeners.
    ///
    /// With logos on, the returned [`AtlasJob`] must be run off the frame
    /// loop and its result passed to [`finish_atlas`](Self::finish_atlas).
    /// With logos off the field starts at once on the plain-dot texture.
    pub fn mount<F>(
        host: Box<dyn Host>,
        config: ParticlesConfig,
        create_backend: F,
        scheduler: S,
    ) -> Result<(Self, Option<AtlasJob>), MountError>
    where
        F: FnOnce() -> anyhow::Result<B>,
    {
        config.validate()?;

        let backend = create_backend().map_err(|e| {
            log::error!("particle field not mounted: {e:#}");
            MountError::ContextCreation(e)
        })?;

        let uniforms = ParticleUniforms {
            time: 0.0,
            spread: config.particle_spread,
            base_size: config.particle_base_size,
            size_randomness: config.size_randomness,
            alpha_particles: config.alpha_particles,
            texture: None,
        };

        let mut engine = Self {
            host,
            camera: Camera::new(config.camera_distance),
            uniforms,
            motion: Motion::default(),
            clock: FrameClock::new(),
            pointer: Vec2::ZERO,
            listeners: Listeners {
                resize: true,
                pointer: config.move_particles_on_hover,
            },
            state: LoopState::Stopped,
            phase: Phase::Pending,
            config,
            backend,
            scheduler,
        };

        engine.apply_host_size();
        log::info!(
            "mounted particle field: {} particles, logos {}",
            engine.config.particle_count,
            if engine.config.show_logos { "on" } else { "off" }
        );

        if !engine.config.show_logos {
            let texture = engine.backend.upload_texture(&dot_texture());
            engine.start_field(texture, &[]);
            return Ok((engine, None));
        }

        let job = AtlasJob {
            entries: engine.config.icons.clone(),
            size: engine.config.atlas_size,
            loader: Arc::new(FileIconLoader::default()),
            glyphs: engine.glyph_synth(),
        };
        Ok((engine, Some(job)))
    }

    /// Applies a finished atlas build and starts the field.
    ///
    /// A failed build degrades to the plain-dot texture. Results arriving
    /// after teardown, or after the field already started, are dropped.
    pub fn finish_atlas(&mut self, result: Result<Atlas, AtlasBuildError>) {
        match self.phase {
            Phase::Disposed => {
                log::debug!("atlas result discarded: engine already disposed");
                return;
            }
            Phase::Live => {
                log::debug!("atlas result discarded: field already running");
                return;
            }
            Phase::Pending => {}
        }

        match result {
            Ok(atlas) => {
                let synthesized = atlas.cells().iter().filter(|c| c.synthesized).count();
                log::debug!(
                    "atlas ready: {} cells ({synthesized} synthesized)",
                    atlas.cells().len()
                );
                let texture = self.backend.upload_texture(&atlas.image);
                self.start_field(texture, &atlas.rects());
            }
            Err(e) => {
                log::warn!("atlas build failed ({e}); using plain dots");
                let texture = self.backend.upload_texture(&dot_texture());
                self.start_field(texture, &[]);
            }
        }
    }

    /// One tick of the frame loop. Stale requests and a stopped loop are ignored.
    ///
    /// The delta since the previous tick is clamped to 0.1 ms ..= 250 ms, so a
    /// stalled or occluded window resumes without a jump in the animation.
    pub fn on_frame(&mut self, request: FrameRequest, now: Instant) {
        if self.state != LoopState::Running(request) {
            return;
        }

        let ft = self.clock.tick_at(now);
        let params = MotionParams {
            speed: self.config.speed,
            hover_factor: self
                .config
                .move_particles_on_hover
                .then_some(self.config.particle_hover_factor),
            rotate: !self.config.disable_rotation,
        };
        self.motion.advance(ft.dt_millis(), self.pointer, params);

        self.uniforms.time = self.motion.time();
        self.backend.set_uniforms(&self.uniforms);

        match self.backend.render(&self.camera, &self.motion.transform) {
            RenderStatus::Drawn | RenderStatus::Skipped => {
                self.state = LoopState::Running(self.scheduler.request_frame());
            }
            RenderStatus::Fatal => {
                log::error!("GPU context lost; tearing the particle field down");
                self.state = LoopState::Stopped;
                self.dispose();
            }
        }
    }

    /// Resize listener: refits the drawable and camera to the host.
    pub fn on_resize(&mut self) {
        if !self.listeners.resize {
            return;
        }
        self.apply_host_size();
    }

    /// Pointer listener. `x`, `y` are physical pixels relative to the host.
    pub fn on_pointer_moved(&mut self, x: f32, y: f32) {
        if !self.listeners.pointer {
            return;
        }
        let (w, h) = self.host.client_size();
        self.pointer = Viewport::new(w as f32, h as f32).to_ndc(x, y);
    }

    /// Stops the loop, removes listeners and releases the backend.
    ///
    /// Safe to call any number of times.
    pub fn dispose(&mut self) {
        if self.phase == Phase::Disposed {
            return;
        }

        if let LoopState::Running(request) = self.state {
            self.scheduler.cancel_frame(request);
        }
        self.state = LoopState::Stopped;
        self.listeners = Listeners::NONE;
        self.backend.dispose();
        self.phase = Phase::Disposed;
        log::debug!("particle loop stopped");
    }

    pub fn loop_state(&self) -> LoopState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn listeners(&self) -> Listeners {
        self.listeners
    }

    pub fn mesh_offset(&self) -> Vec3 {
        self.motion.transform.offset
    }

    pub fn mesh_rotation(&self) -> Vec3 {
        self.motion.transform.rotation
    }

    /// Scaled animation milliseconds.
    pub fn elapsed(&self) -> f64 {
        self.motion.elapsed
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    // ── private helpers ────────────────────────────────────────────────────

    /// Generate, upload, start: strictly in this order.
    fn start_field(&mut self, texture: TextureHandle, cells: &[UvRect]) {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let palette = self.config.palette();
        let buffers = generate(self.config.particle_count, &palette, cells, &mut rng);

        self.uniforms.texture = Some(texture);
        self.backend.upload(&buffers);
        self.backend.set_uniforms(&self.uniforms);

        self.clock.reset();
        self.state = LoopState::Running(self.scheduler.request_frame());
        self.phase = Phase::Live;
        log::debug!("particle loop started with {} particles", buffers.len());
    }

    fn apply_host_size(&mut self) {
        let (w, h) = self.host.client_size();
        self.backend.resize(w, h);
        self.camera.set_aspect(Viewport::new(w as f32, h as f32).aspect());
    }

    fn glyph_synth(&self) -> Option<Arc<dyn GlyphSynth>> {
        let glyphs = match &self.config.fallback_font {
            Some(bytes) => GlowGlyphs::from_bytes(bytes),
            None => GlowGlyphs::from_system(),
        };
        match glyphs {
            Ok(g) => Some(Arc::new(g)),
            Err(e) => {
                log::warn!("no fallback font for missing icons: {e}");
                None
            }
        }
    }
}

impl<B: ParticleBackend, S: FrameScheduler> Drop for ParticleEngine<B, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasEntry, AtlasLayout};
    use crate::field::ParticleBuffers;
    use crate::paint::Rgb;
    use crate::render::MeshTransform;
    use image::RgbaImage;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Calls {
        uploads: Vec<usize>,
        textures: Vec<(u32, u32)>,
        uniforms: Vec<ParticleUniforms>,
        renders: usize,
        resizes: Vec<(u32, u32)>,
        disposes: usize,
        requested: Vec<FrameRequest>,
        cancelled: Vec<FrameRequest>,
    }

    type Log = Rc<RefCell<Calls>>;

    struct MockBackend {
        log: Log,
        status: RenderStatus,
    }

    impl ParticleBackend for MockBackend {
        fn upload(&mut self, buffers: &ParticleBuffers) {
            self.log.borrow_mut().uploads.push(buffers.len());
        }

        fn upload_texture(&mut self, image: &RgbaImage) -> TextureHandle {
            let mut log = self.log.borrow_mut();
            log.textures.push(image.dimensions());
            TextureHandle(log.textures.len() as u32 - 1)
        }

        fn set_uniforms(&mut self, uniforms: &ParticleUniforms) {
            self.log.borrow_mut().uniforms.push(*uniforms);
        }

        fn render(&mut self, _camera: &Camera, _transform: &MeshTransform) -> RenderStatus {
            self.log.borrow_mut().renders += 1;
            self.status
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.log.borrow_mut().resizes.push((width, height));
        }

        fn dispose(&mut self) {
            self.log.borrow_mut().disposes += 1;
        }
    }

    struct ManualScheduler {
        log: Log,
        next: u64,
    }

    impl FrameScheduler for ManualScheduler {
        fn request_frame(&mut self) -> FrameRequest {
            self.next += 1;
            let req = FrameRequest(self.next);
            self.log.borrow_mut().requested.push(req);
            req
        }

        fn cancel_frame(&mut self, request: FrameRequest) {
            self.log.borrow_mut().cancelled.push(request);
        }
    }

    struct FixedHost(u32, u32);

    impl Host for FixedHost {
        fn client_size(&self) -> (u32, u32) {
            (self.0, self.1)
        }
    }

    type Engine = ParticleEngine<MockBackend, ManualScheduler>;

    fn mount_with(config: ParticlesConfig, status: RenderStatus) -> (Engine, Option<AtlasJob>, Log) {
        let log = Log::default();
        let backend = MockBackend { log: log.clone(), status };
        let scheduler = ManualScheduler { log: log.clone(), next: 0 };
        let (engine, job) = Engine::mount(
            Box::new(FixedHost(800, 600)),
            config.with_seed(9),
            || Ok(backend),
            scheduler,
        )
        .unwrap();
        (engine, job, log)
    }

    fn dots() -> ParticlesConfig {
        ParticlesConfig::default().with_logos(false)
    }

    fn pending_request(engine: &Engine) -> FrameRequest {
        match engine.loop_state() {
            LoopState::Running(req) => req,
            LoopState::Stopped => panic!("loop is not running"),
        }
    }

    fn tick(engine: &mut Engine) {
        let req = pending_request(engine);
        engine.on_frame(req, Instant::now() + Duration::from_millis(16));
    }

    fn one_cell_atlas() -> Atlas {
        let layout = AtlasLayout::new(1, 64).unwrap();
        let cell = crate::atlas::AtlasCell {
            name: "React".into(),
            uv: layout.uv(0),
            synthesized: true,
        };
        Atlas::new(RgbaImage::new(64, 64), vec![cell])
    }

    #[test]
    fn mount_without_logos_starts_immediately() {
        let (engine, job, log) = mount_with(dots(), RenderStatus::Drawn);
        assert!(job.is_none());
        assert_eq!(engine.phase(), Phase::Live);
        assert!(engine.loop_state().is_running());

        let log = log.borrow();
        assert_eq!(log.resizes, vec![(800, 600)]);
        assert_eq!(log.textures, vec![(64, 64)]);
        assert_eq!(log.uploads, vec![200]);
        assert_eq!(log.uniforms.last().unwrap().texture, Some(TextureHandle(0)));
        assert!((engine.camera().aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn mount_with_logos_waits_for_atlas() {
        let (mut engine, job, log) = mount_with(ParticlesConfig::default(), RenderStatus::Drawn);
        let job = job.expect("atlas job");
        assert_eq!(job.entries.len(), 2);
        assert_eq!(engine.phase(), Phase::Pending);
        assert_eq!(engine.loop_state(), LoopState::Stopped);
        assert!(log.borrow().uploads.is_empty());

        engine.finish_atlas(Ok(one_cell_atlas()));
        assert_eq!(engine.phase(), Phase::Live);
        assert_eq!(log.borrow().uploads, vec![200]);
    }

    #[test]
    fn atlas_failure_falls_back_to_dot() {
        let (mut engine, _job, log) = mount_with(ParticlesConfig::default(), RenderStatus::Drawn);
        engine.finish_atlas(Err(AtlasBuildError::NoFont));

        assert!(engine.loop_state().is_running());
        assert_eq!(log.borrow().textures, vec![(64, 64)]);
        tick(&mut engine);
        assert_eq!(log.borrow().renders, 1);
    }

    #[test]
    fn atlas_after_dispose_is_discarded() {
        let (mut engine, _job, log) = mount_with(ParticlesConfig::default(), RenderStatus::Drawn);
        engine.dispose();
        engine.finish_atlas(Ok(one_cell_atlas()));

        let log = log.borrow();
        assert!(log.textures.is_empty());
        assert!(log.uploads.is_empty());
        assert!(log.requested.is_empty());
        assert_eq!(engine.loop_state(), LoopState::Stopped);
    }

    #[test]
    fn dispose_before_first_frame_renders_nothing() {
        let (mut engine, _job, log) = mount_with(dots(), RenderStatus::Drawn);
        let req = pending_request(&engine);
        engine.dispose();

        // The platform may still deliver the cancelled callback.
        engine.on_frame(req, Instant::now());

        let log = log.borrow();
        assert_eq!(log.renders, 0);
        assert_eq!(log.cancelled, vec![req]);
        assert_eq!(engine.loop_state(), LoopState::Stopped);
    }

    #[test]
    fn dispose_is_idempotent() {
        let (mut engine, _job, log) = mount_with(dots(), RenderStatus::Drawn);
        engine.dispose();
        engine.dispose();

        assert_eq!(engine.listeners(), Listeners::NONE);
        assert_eq!(log.borrow().disposes, 1);
        assert_eq!(log.borrow().cancelled.len(), 1);

        drop(engine);
        assert_eq!(log.borrow().disposes, 1);
    }

    #[test]
    fn frames_reschedule_and_ignore_stale_requests() {
        let (mut engine, _job, log) = mount_with(dots(), RenderStatus::Drawn);
        let first = pending_request(&engine);
        tick(&mut engine);

        let second = pending_request(&engine);
        assert_ne!(first, second);

        engine.on_frame(first, Instant::now());
        assert_eq!(log.borrow().renders, 1);
        assert!(engine.elapsed() > 0.0);
    }

    #[test]
    fn hover_moves_mesh_away_from_pointer() {
        let (mut engine, _job, _log) = mount_with(dots().with_hover(2.0), RenderStatus::Drawn);
        assert!(engine.listeners().pointer);

        engine.on_pointer_moved(0.0, 0.0);
        tick(&mut engine);
        assert_eq!(engine.mesh_offset(), Vec3::new(2.0, -2.0, 0.0));

        engine.on_pointer_moved(0.0, 600.0);
        tick(&mut engine);
        assert_eq!(engine.mesh_offset(), Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn pointer_is_ignored_without_hover() {
        let (mut engine, _job, _log) = mount_with(dots(), RenderStatus::Drawn);
        assert!(!engine.listeners().pointer);

        engine.on_pointer_moved(0.0, 0.0);
        tick(&mut engine);
        assert_eq!(engine.mesh_offset(), Vec3::ZERO);
    }

    #[test]
    fn rotation_disabled_keeps_mesh_still() {
        let (mut engine, _job, _log) = mount_with(dots().with_rotation(false), RenderStatus::Drawn);
        for _ in 0..5 {
            tick(&mut engine);
        }
        assert_eq!(engine.mesh_rotation(), Vec3::ZERO);
    }

    #[test]
    fn time_uniform_follows_elapsed() {
        let (mut engine, _job, log) = mount_with(dots().with_speed(1.0), RenderStatus::Drawn);
        tick(&mut engine);

        let time = log.borrow().uniforms.last().unwrap().time;
        assert!((time as f64 - engine.elapsed() * 0.001).abs() < 1e-6);
        assert!(engine.elapsed() >= 16.0);
    }

    #[test]
    fn zero_particles_still_render() {
        let (mut engine, _job, log) = mount_with(dots().with_count(0), RenderStatus::Drawn);
        tick(&mut engine);

        let log = log.borrow();
        assert_eq!(log.uploads, vec![0]);
        assert_eq!(log.renders, 1);
    }

    #[test]
    fn resize_refits_backend_and_camera() {
        let (mut engine, _job, log) = mount_with(dots(), RenderStatus::Drawn);
        engine.on_resize();
        assert_eq!(log.borrow().resizes.len(), 2);

        engine.dispose();
        engine.on_resize();
        assert_eq!(log.borrow().resizes.len(), 2);
    }

    #[test]
    fn fatal_render_tears_down() {
        let (mut engine, _job, log) = mount_with(dots(), RenderStatus::Fatal);
        tick(&mut engine);

        assert_eq!(engine.phase(), Phase::Disposed);
        assert_eq!(engine.loop_state(), LoopState::Stopped);
        assert_eq!(log.borrow().disposes, 1);
        assert_eq!(log.borrow().requested.len(), 1);
    }

    #[test]
    fn context_failure_mounts_nothing() {
        let log = Log::default();
        let scheduler = ManualScheduler { log: log.clone(), next: 0 };
        let res = Engine::mount(
            Box::new(FixedHost(800, 600)),
            dots(),
            || Err(anyhow::anyhow!("no adapter")),
            scheduler,
        );

        assert!(matches!(res, Err(MountError::ContextCreation(_))));
        assert!(log.borrow().requested.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_before_backend() {
        let log = Log::default();
        let scheduler = ManualScheduler { log: log.clone(), next: 0 };
        let mut created = false;
        let res = Engine::mount(
            Box::new(FixedHost(800, 600)),
            dots().with_speed(f32::NAN),
            || {
                created = true;
                Ok(MockBackend { log: log.clone(), status: RenderStatus::Drawn })
            },
            scheduler,
        );

        assert!(matches!(res, Err(MountError::Config(ConfigError::NonFinite("speed")))));
        assert!(!created);
    }

    #[test]
    fn fallback_font_bytes_are_used_for_glyphs() {
        let cfg = ParticlesConfig {
            fallback_font: Some(b"not a font".to_vec()),
            icons: vec![AtlasEntry::new("X", "x", Rgb::WHITE)],
            ..Default::default()
        };
        let (_engine, job, _log) = mount_with(cfg, RenderStatus::Drawn);
        assert!(job.expect("atlas job").glyphs.is_none());
    }
}
