//! Animation loop and viewport manager.
//!
//! A `Tunnel` owns every piece of animation state for one mounted instance. The
//! host supplies the raster surface and a `FrameDriver`; the tunnel asks the
//! driver for the next frame at the end of each tick and cancels it on unmount.
//!
//! Lifecycle: Uninitialized -> Sized -> Populated -> Running -> Stopped. A resize
//! while running goes back through Sized and Populated and resumes.

use crate::aperture::Aperture;
use crate::canvas::Canvas;
use crate::colors::Palette;
use crate::config::TunnelConfig;
use crate::disc::{DiscShape, DiscStack};
use crate::lines::{LayerKey, LineGrid, LineLayer};
use crate::particles::{ParticleStream, SpawnArea};
use rand::rngs::StdRng;
use serde::Serialize;

/// Handle for one requested frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameToken(pub u64);

/// Host-side refresh signal
pub trait FrameDriver {
    /// Arrange for the tunnel's `frame` to be called once more
    fn request_frame(&mut self) -> FrameToken;
    /// Withdraw a request that has not fired yet
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Logical surface size and the raster pixels per logical unit
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        Self { width, height, scale }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Raster surface matching this viewport
    pub fn canvas(&self) -> Option<Canvas> {
        Canvas::for_viewport(self.width, self.height, self.scale)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Sized,
    Populated,
    Running,
    Stopped,
}

/// Everything derived from one viewport size. Rebuilt whole and swapped in.
pub struct Scene {
    pub viewport: Viewport,
    pub discs: DiscStack,
    pub aperture: Aperture,
    pub grid: LineGrid,
    pub lines: Option<LineLayer>,
    pub particles: ParticleStream,
    pub revision: u64,
}

impl Scene {
    pub fn build(
        viewport: Viewport,
        config: &TunnelConfig,
        palette: &Palette,
        revision: u64,
        rng: &mut StdRng,
    ) -> Self {
        let Viewport { width, height, .. } = viewport;
        let start = DiscShape::from_proportions(&config.start, width, height);
        let end = DiscShape::from_proportions(&config.end, width, height);

        let discs = DiscStack::build(start, end, config.total_discs);
        let aperture = Aperture::detect(&discs, height);
        let grid = if viewport.is_empty() {
            LineGrid::default()
        } else {
            LineGrid::build(&discs, config.total_lines)
        };

        let area = SpawnArea::around_mouth(aperture.disc.w, width, height, config.spawn_height);
        let particles = ParticleStream::seed(
            area,
            config.total_particles,
            palette.particle_rgb,
            config.recycle,
            rng,
        );

        let mut scene = Self {
            viewport,
            discs,
            aperture,
            grid,
            lines: None,
            particles,
            revision,
        };
        scene.refresh_lines(config, palette);
        scene
    }

    /// Key the cached line layer must carry for this scene
    pub fn layer_key(&self) -> Option<LayerKey> {
        let canvas_w = (self.viewport.width * self.viewport.scale).ceil();
        let canvas_h = (self.viewport.height * self.viewport.scale).ceil();
        if self.viewport.is_empty() || canvas_w < 1.0 || canvas_h < 1.0 {
            return None;
        }
        Some(LayerKey {
            width: canvas_w as u32,
            height: canvas_h as u32,
            scale_bits: self.viewport.scale.to_bits(),
            revision: self.revision,
        })
    }

    /// Re-render the line layer unless the cached one is still valid
    pub fn refresh_lines(&mut self, config: &TunnelConfig, palette: &Palette) {
        let Some(key) = self.layer_key() else {
            self.lines = None;
            log::debug!(
                "skipping line layer for empty viewport {}x{}",
                self.viewport.width,
                self.viewport.height
            );
            return;
        };
        if self.lines.as_ref().is_some_and(|layer| layer.matches(&key)) {
            return;
        }

        self.lines = LineLayer::render(
            &self.grid,
            &self.aperture.region,
            (self.viewport.width, self.viewport.height),
            self.viewport.scale,
            self.revision,
            config.line_width,
            palette.stroke,
        );
        log::debug!("rendered line layer {:?}", key);
    }
}

pub struct Tunnel {
    config: TunnelConfig,
    palette: Palette,
    phase: Phase,
    viewport: Option<Viewport>,
    scene: Option<Scene>,
    pending: Option<FrameToken>,
    revision: u64,
    frames: u64,
    rng: StdRng,
}

impl Tunnel {
    pub fn new(config: TunnelConfig, rng: StdRng) -> Self {
        let palette = Palette::from_config(&config);
        Self {
            config,
            palette,
            phase: Phase::Uninitialized,
            viewport: None,
            scene: None,
            pending: None,
            revision: 0,
            frames: 0,
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.pending
    }

    /// Frames drawn since mount
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn config(&self) -> &TunnelConfig {
        &self.config
    }

    /// Attach to a surface of the given size and start animating
    pub fn mount(&mut self, viewport: Viewport, driver: &mut dyn FrameDriver) {
        if self.phase == Phase::Running {
            self.resize(viewport);
            return;
        }
        self.set_size(viewport);
        self.populate();
        self.frames = 0;
        self.phase = Phase::Running;
        self.pending = Some(driver.request_frame());
    }

    /// Re-measure and rebuild everything. Ignored once stopped or before mount.
    pub fn resize(&mut self, viewport: Viewport) {
        match self.phase {
            Phase::Uninitialized | Phase::Stopped => return,
            _ => {}
        }
        let resume = self.phase == Phase::Running;
        self.set_size(viewport);
        self.populate();
        if resume {
            self.phase = Phase::Running;
        }
    }

    fn set_size(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.phase = Phase::Sized;
    }

    fn populate(&mut self) {
        let Some(viewport) = self.viewport else {
            return;
        };
        self.revision += 1;
        let scene = Scene::build(viewport, &self.config, &self.palette, self.revision, &mut self.rng);
        log::debug!(
            "scene rebuilt for {}x{}@{}: aperture disc {} of {}",
            viewport.width,
            viewport.height,
            viewport.scale,
            scene.aperture.index,
            scene.discs.len()
        );
        // old scene dropped whole; the next tick sees only the new one
        self.scene = Some(scene);
        self.phase = Phase::Populated;
    }

    /// One tick: advance, draw onto `canvas`, and re-arm the driver.
    ///
    /// Without a canvas the tick is skipped but the loop stays alive. Returns
    /// whether anything was drawn.
    pub fn frame(&mut self, canvas: Option<&mut Canvas>, driver: &mut dyn FrameDriver) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.pending = None;

        let drawn = match canvas {
            Some(canvas) => {
                self.step();
                self.draw(canvas)
            }
            None => false,
        };
        if drawn {
            self.frames += 1;
        }

        self.pending = Some(driver.request_frame());
        drawn
    }

    /// Advance discs and particles by one tick
    pub fn step(&mut self) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        scene.discs.advance(self.config.progress_step);
        scene.particles.update(&mut self.rng);
    }

    /// Draw the current state: outer disc, sampled discs, lines, particles
    pub fn draw(&mut self, canvas: &mut Canvas) -> bool {
        let Some(scene) = self.scene.as_mut() else {
            return false;
        };
        scene.refresh_lines(&self.config, &self.palette);

        let width = self.config.line_width;
        let stroke = self.palette.stroke;
        let mouth = scene.aperture.region;
        let clip_below = scene.aperture.disc.w - self.config.clip_margin;

        canvas.clear();
        canvas.reset_clip();

        let outer = scene.discs.start;
        canvas.stroke_ellipse(outer.x, outer.y, outer.w, outer.h, width, stroke);

        let stride = self.config.disc_stride.max(1);
        for disc in scene.discs.discs.iter().step_by(stride) {
            if disc.w < clip_below {
                canvas.clip(mouth);
            }
            canvas.stroke_ellipse(disc.x, disc.y, disc.w, disc.h, width, stroke);
            canvas.reset_clip();
        }

        if let Some(layer) = &scene.lines {
            if layer.canvas.width() == canvas.width() && layer.canvas.height() == canvas.height() {
                canvas.draw_canvas(&layer.canvas);
            }
        }

        scene.particles.draw(canvas, &mouth);
        true
    }

    /// Swap colors; the line layer is re-rendered on the next draw
    pub fn set_palette(&mut self, palette: Palette) {
        if palette == self.palette {
            return;
        }
        self.palette = palette;
        if let Some(scene) = self.scene.as_mut() {
            self.revision += 1;
            scene.revision = self.revision;
            scene.particles.set_tint(palette.particle_rgb);
        }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn reseed_particles(&mut self) {
        if let Some(scene) = self.scene.as_mut() {
            scene.particles.reseed(&mut self.rng);
        }
    }

    /// Stop the loop and release the scene, including the line layer
    pub fn unmount(&mut self, driver: &mut dyn FrameDriver) {
        if let Some(token) = self.pending.take() {
            log::debug!("cancelling pending frame {:?}", token);
            driver.cancel_frame(token);
        }
        self.scene = None;
        self.phase = Phase::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::scheme_palette;
    use crate::disc::Disc;
    use rand::SeedableRng;

    /// Driver that just records requests and cancellations
    #[derive(Default)]
    struct RecordingDriver {
        next: u64,
        requested: Vec<FrameToken>,
        cancelled: Vec<FrameToken>,
    }

    impl FrameDriver for RecordingDriver {
        fn request_frame(&mut self) -> FrameToken {
            self.next += 1;
            let token = FrameToken(self.next);
            self.requested.push(token);
            token
        }

        fn cancel_frame(&mut self, token: FrameToken) {
            self.cancelled.push(token);
        }
    }

    fn small_config() -> TunnelConfig {
        TunnelConfig {
            total_lines: 24,
            total_particles: 30,
            ..TunnelConfig::default()
        }
    }

    fn tunnel() -> Tunnel {
        Tunnel::new(small_config(), StdRng::seed_from_u64(42))
    }

    #[test]
    fn mount_runs_and_requests_a_frame() {
        let mut driver = RecordingDriver::default();
        let mut t = tunnel();
        assert_eq!(t.phase(), Phase::Uninitialized);

        t.mount(Viewport::new(200.0, 150.0, 1.0), &mut driver);
        assert_eq!(t.phase(), Phase::Running);
        assert_eq!(driver.requested.len(), 1);
        assert_eq!(t.pending_frame(), Some(FrameToken(1)));

        let scene = t.scene().unwrap();
        assert_eq!(scene.discs.len(), 100);
        assert_eq!(scene.grid.len(), 24);
        assert_eq!(scene.particles.len(), 30);
        assert!(scene.lines.is_some());
    }

    #[test]
    fn frame_draws_and_rearms() {
        let mut driver = RecordingDriver::default();
        let mut t = tunnel();
        let viewport = Viewport::new(200.0, 150.0, 1.0);
        t.mount(viewport, &mut driver);
        let mut canvas = viewport.canvas().unwrap();

        let before = t.scene().unwrap().discs.discs[0].progress;
        assert!(t.frame(Some(&mut canvas), &mut driver));
        assert!(t.frame(Some(&mut canvas), &mut driver));
        assert_eq!(t.frames(), 2);
        assert_eq!(driver.requested.len(), 3);
        assert_eq!(t.pending_frame(), Some(FrameToken(3)));

        let after = t.scene().unwrap().discs.discs[0].progress;
        assert!((after - before - 0.002).abs() < 1e-6);
        assert!(canvas.image().pixels().any(|p| p.0[3] > 0));
    }

    #[test]
    fn missing_canvas_skips_but_keeps_loop_alive() {
        let mut driver = RecordingDriver::default();
        let mut t = tunnel();
        t.mount(Viewport::new(200.0, 150.0, 1.0), &mut driver);
        let before = t.scene().unwrap().discs.discs[5];

        assert!(!t.frame(None, &mut driver));
        assert_eq!(driver.requested.len(), 2);
        assert_eq!(t.scene().unwrap().discs.discs[5], before);
        assert_eq!(t.frames(), 0);
    }

    #[test]
    fn resize_replaces_the_whole_scene() {
        let mut driver = RecordingDriver::default();
        let mut t = tunnel();
        t.mount(Viewport::new(800.0, 600.0, 1.0), &mut driver);
        let (old_rev, old_w, old_index) = {
            let s = t.scene().unwrap();
            (s.revision, s.aperture.disc.w, s.aperture.index)
        };
        assert_eq!(old_index, 77);

        t.resize(Viewport::new(1600.0, 1200.0, 1.0));
        assert_eq!(t.phase(), Phase::Running);
        let s = t.scene().unwrap();
        assert!(s.revision > old_rev);
        assert_eq!(s.viewport.width, 1600.0);
        assert!((s.aperture.disc.w - old_w * 2.0).abs() < 1e-2);
        assert!((s.discs.start.w - 1200.0).abs() < 1e-3);
        assert!((s.particles.area.height - 1020.0).abs() < 1e-2);
        assert!(s.particles.particles.iter().all(|p| p.y <= 1020.0));
        assert_eq!(s.lines.as_ref().unwrap().key.width, 1600);
        // resize never requests an extra frame
        assert_eq!(driver.requested.len(), 1);
    }

    #[test]
    fn zero_viewport_builds_no_line_layer() {
        let mut driver = RecordingDriver::default();
        let mut t = tunnel();
        let viewport = Viewport::new(0.0, 0.0, 1.0);
        t.mount(viewport, &mut driver);

        assert_eq!(t.phase(), Phase::Running);
        assert!(t.scene().unwrap().grid.is_empty());
        assert!(t.scene().unwrap().lines.is_none());
        assert!(viewport.canvas().is_none());
        assert!(!t.frame(viewport.canvas().as_mut(), &mut driver));
    }

    #[test]
    fn unmount_cancels_pending_and_releases_scene() {
        let mut driver = RecordingDriver::default();
        let mut t = tunnel();
        let viewport = Viewport::new(120.0, 90.0, 1.0);
        t.mount(viewport, &mut driver);
        let mut canvas = viewport.canvas().unwrap();
        t.frame(Some(&mut canvas), &mut driver);

        t.unmount(&mut driver);
        assert_eq!(t.phase(), Phase::Stopped);
        assert_eq!(driver.cancelled, vec![FrameToken(2)]);
        assert!(t.scene().is_none());
        assert!(t.pending_frame().is_none());

        // a late callback after teardown does nothing
        assert!(!t.frame(Some(&mut canvas), &mut driver));
        assert_eq!(driver.requested.len(), 2);
        t.resize(Viewport::new(300.0, 300.0, 1.0));
        assert!(t.scene().is_none());
    }

    #[test]
    fn palette_change_invalidates_line_layer() {
        let mut driver = RecordingDriver::default();
        let mut t = tunnel();
        let viewport = Viewport::new(160.0, 120.0, 1.0);
        t.mount(viewport, &mut driver);
        let first_key = t.scene().unwrap().lines.as_ref().unwrap().key;

        let config = t.config().clone();
        t.set_palette(scheme_palette(2, &config));
        let mut canvas = viewport.canvas().unwrap();
        t.frame(Some(&mut canvas), &mut driver);

        let scene = t.scene().unwrap();
        let key = scene.lines.as_ref().unwrap().key;
        assert!(key.revision > first_key.revision);
        assert_eq!((key.width, key.height), (first_key.width, first_key.height));
        let tint = scheme_palette(2, &config).particle_rgb;
        assert!(scene.particles.particles.iter().all(|p| p.color.0[..3] == tint));
    }

    #[test]
    fn pixel_scale_sizes_the_layer() {
        let mut driver = RecordingDriver::default();
        let mut t = tunnel();
        t.mount(Viewport::new(100.0, 80.0, 2.0), &mut driver);
        let key = t.scene().unwrap().lines.as_ref().unwrap().key;
        assert_eq!((key.width, key.height), (200, 160));
        assert_eq!(key.scale_bits, 2f32.to_bits());
    }

    /// Discs and particles only, on a 200x150 viewport
    fn disc_tunnel(stride: usize, particles: usize) -> (Tunnel, Viewport, RecordingDriver) {
        let config = TunnelConfig {
            total_lines: 0,
            total_particles: particles,
            disc_stride: stride,
            ..TunnelConfig::default()
        };
        let mut driver = RecordingDriver::default();
        let mut t = Tunnel::new(config, StdRng::seed_from_u64(7));
        let viewport = Viewport::new(200.0, 150.0, 1.0);
        t.mount(viewport, &mut driver);
        (t, viewport, driver)
    }

    /// Outer disc, then the sampled discs `pick` accepts (narrow ones clipped), then the line layer
    fn disc_reference(t: &Tunnel, viewport: Viewport, pick: impl Fn(&Disc, bool) -> bool) -> Canvas {
        let scene = t.scene().unwrap();
        let config = t.config();
        let stroke = t.palette().stroke;
        let width = config.line_width;
        let clip_below = scene.aperture.disc.w - config.clip_margin;

        let mut canvas = viewport.canvas().unwrap();
        let outer = scene.discs.start;
        canvas.stroke_ellipse(outer.x, outer.y, outer.w, outer.h, width, stroke);
        for disc in scene.discs.discs.iter().step_by(config.disc_stride) {
            let narrow = disc.w < clip_below;
            if !pick(disc, narrow) {
                continue;
            }
            if narrow {
                canvas.clip(scene.aperture.region);
            }
            canvas.stroke_ellipse(disc.x, disc.y, disc.w, disc.h, width, stroke);
            canvas.reset_clip();
        }
        if let Some(layer) = &scene.lines {
            canvas.draw_canvas(&layer.canvas);
        }
        canvas
    }

    /// Pixel centers (scale 1) where the two rasters differ
    fn changed_pixels(a: &Canvas, b: &Canvas) -> Vec<(f32, f32)> {
        a.image()
            .enumerate_pixels()
            .filter(|(x, y, p)| *p != b.image().get_pixel(*x, *y))
            .map(|(x, y, _)| (x as f32 + 0.5, y as f32 + 0.5))
            .collect()
    }

    #[test]
    fn draw_samples_every_stride_disc() {
        let (mut t, viewport, _) = disc_tunnel(7, 0);
        let mut canvas = viewport.canvas().unwrap();
        assert!(t.draw(&mut canvas));

        let expected = disc_reference(&t, viewport, |_, _| true);
        assert_eq!(canvas.image().as_raw(), expected.image().as_raw());

        let (mut dense, _, _) = disc_tunnel(1, 0);
        let mut dense_canvas = viewport.canvas().unwrap();
        dense.draw(&mut dense_canvas);
        assert_ne!(canvas.image().as_raw(), dense_canvas.image().as_raw());
    }

    #[test]
    fn narrow_discs_only_paint_inside_the_mouth() {
        let (mut t, viewport, _) = disc_tunnel(5, 0);
        let mut canvas = viewport.canvas().unwrap();
        t.draw(&mut canvas);
        let mouth = t.scene().unwrap().aperture.region;

        let wide_only = disc_reference(&t, viewport, |_, narrow| !narrow);
        let changed = changed_pixels(&canvas, &wide_only);
        assert!(!changed.is_empty(), "narrow discs drew nothing");
        assert!(changed.iter().all(|&(x, y)| mouth.contains(x, y)));

        // the same discs unclipped would spill past the mouth
        let mut loose = viewport.canvas().unwrap();
        let clip_below = t.scene().unwrap().aperture.disc.w - t.config().clip_margin;
        for disc in t.scene().unwrap().discs.discs.iter().step_by(5).filter(|d| d.w < clip_below) {
            loose.stroke_ellipse(disc.x, disc.y, disc.w, disc.h, 2.0, t.palette().stroke);
        }
        assert!(loose
            .image()
            .enumerate_pixels()
            .any(|(x, y, p)| p.0[3] > 0 && !mouth.contains(x as f32 + 0.5, y as f32 + 0.5)));
    }

    #[test]
    fn wide_discs_are_drawn_past_the_mouth() {
        let (mut t, viewport, _) = disc_tunnel(5, 0);
        let mut canvas = viewport.canvas().unwrap();
        t.draw(&mut canvas);
        let mouth = t.scene().unwrap().aperture.region;

        let outer_only = disc_reference(&t, viewport, |_, _| false);
        let changed = changed_pixels(&canvas, &outer_only);
        assert!(changed.iter().any(|&(x, y)| !mouth.contains(x, y)));
    }

    #[test]
    fn particles_never_land_outside_the_mouth() {
        let (mut t, viewport, mut driver) = disc_tunnel(5, 100);
        let mut canvas = viewport.canvas().unwrap();
        let mouth = t.scene().unwrap().aperture.region;

        let mut seen = 0;
        for _ in 0..40 {
            assert!(t.frame(Some(&mut canvas), &mut driver));
            let discs_only = disc_reference(&t, viewport, |_, _| true);
            let changed = changed_pixels(&canvas, &discs_only);
            assert!(changed.iter().all(|&(x, y)| mouth.contains(x, y)));
            seen += changed.len();
        }
        assert!(seen > 0, "no particle was ever drawn");
    }
}
