//! Rain and snow particle field.
//!
//! The field owns its particle population and an animation loop flag. The
//! host drives it with [`ParticleField::frame`] from its animation-frame
//! callback; the field measures clamped frame deltas itself.

pub mod particle;

pub use particle::{Motion, Particle};

use std::time::Instant;

use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::atmosphere::color::Rgb;
use crate::atmosphere::waypoint::Phase;
use crate::atmosphere::weather::ParticleSpec;
use crate::core::time::FrameClock;

/// Drawing target for particles. Coordinates are canvas pixels with the
/// origin at the top left.
pub trait ParticleCanvas {
    /// Canvas size in pixels.
    fn size(&self) -> Vec2;
    fn clear(&mut self);
    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgb, alpha: f32);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgb, alpha: f32);
}

// ---------------------------------------------------------------------------
// ParticleField
// ---------------------------------------------------------------------------

pub struct ParticleField {
    rng: StdRng,
    particles: Vec<Particle>,
    spec: Option<ParticleSpec>,
    phase: Phase,
    bounds: Vec2,
    running: bool,
    clock: FrameClock,
}

impl ParticleField {
    /// Create an empty, stopped field. A seed makes spawns reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            particles: Vec::new(),
            spec: None,
            phase: Phase::Day,
            bounds: Vec2::ZERO,
            running: false,
            clock: FrameClock::new(),
        }
    }

    /// Replace the population with a fresh one for `spec` and start the loop.
    /// The first frame delta is measured from `now`.
    pub fn start(&mut self, spec: ParticleSpec, phase: Phase, bounds: Vec2, now: Instant) {
        self.bounds = bounds;
        self.phase = phase;
        self.spec = Some(spec);

        let count = spec.count();
        let rng = &mut self.rng;
        self.particles = (0..count)
            .map(|_| Particle::spawn(spec.kind, bounds, true, &mut *rng))
            .collect();

        self.clock = FrameClock::new();
        self.clock.anchor(now);
        self.running = true;
        log::debug!("Particles started: {:?} x{} (intensity {})", spec.kind, count, spec.intensity);
    }

    /// Stop the loop and discard the population.
    pub fn stop(&mut self) {
        if self.spec.is_some() {
            log::debug!("Particles stopped");
        }
        self.running = false;
        self.particles.clear();
        self.spec = None;
    }

    /// Stop the loop but keep the population for a later [`resume`](Self::resume).
    pub fn suspend(&mut self) {
        self.running = false;
    }

    /// Restart a suspended loop. The next frame delta is measured from `now`.
    /// Returns `false` if there is nothing to resume.
    pub fn resume(&mut self, now: Instant) -> bool {
        if self.particles.is_empty() {
            return false;
        }
        self.clock.anchor(now);
        self.running = true;
        true
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Kind and intensity of the current population, if any.
    #[inline]
    pub fn spec(&self) -> Option<ParticleSpec> {
        self.spec
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Phase used for the draw color.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Canvas size used for spawning and exit checks.
    pub fn resize(&mut self, bounds: Vec2) {
        self.bounds = bounds;
    }

    /// Advance every particle by `dt` seconds, respawning those that left.
    pub fn step(&mut self, dt: f32) {
        let bounds = self.bounds;
        for p in &mut self.particles {
            if !p.advance(dt, bounds) {
                *p = Particle::spawn(p.kind(), bounds, false, &mut self.rng);
            }
        }
    }

    /// Clear `canvas` and draw the current population.
    pub fn draw(&self, canvas: &mut dyn ParticleCanvas) {
        canvas.clear();
        for p in &self.particles {
            let color = p.color(self.phase);
            match p.motion {
                Motion::Rain { length, wind, line_width } => {
                    let to = p.position + Vec2::new(wind * 1.5, length);
                    canvas.stroke_line(p.position, to, line_width, color, p.opacity);
                }
                Motion::Snow { radius, .. } => {
                    canvas.fill_circle(p.position, radius, color, p.opacity);
                }
            }
        }
    }

    /// One animation frame: advance by the clamped delta since the last
    /// frame and redraw. Does nothing while the loop is stopped.
    pub fn frame(&mut self, now: Instant, canvas: &mut dyn ParticleCanvas) -> bool {
        if !self.running {
            return false;
        }
        let dt = self.clock.tick(now).as_secs_f32();
        self.step(dt);
        self.draw(canvas);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
