//! A single rain drop or snowflake.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use crate::atmosphere::color::Rgb;
use crate::atmosphere::waypoint::Phase;
use crate::atmosphere::weather::ParticleKind;

/// Height above the canvas where respawned particles enter.
pub const SPAWN_HEIGHT: f32 = -20.0;
/// Distance past any edge before a particle is recycled.
pub const EXIT_MARGIN: f32 = 20.0;

const RAIN_NIGHT: Rgb = Rgb::new(140, 160, 190);
const RAIN_DAY: Rgb = Rgb::new(170, 190, 210);

/// Kind-specific particle motion and shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    Rain {
        /// Streak length in pixels.
        length: f32,
        /// Horizontal drift factor.
        wind: f32,
        line_width: f32,
    },
    Snow {
        radius: f32,
        /// Phase of the sideways sway, radians.
        wobble: f32,
        /// Sway rate, radians per second.
        wobble_speed: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    /// Fall speed in pixels per second.
    pub speed: f32,
    pub opacity: f32,
    pub motion: Motion,
}

/// Uniform sample in `[lo, lo + span)`. Zero spans are allowed.
#[inline]
fn spread<R: Rng + ?Sized>(rng: &mut R, lo: f32, span: f32) -> f32 {
    lo + rng.random::<f32>() * span
}

impl Particle {
    /// Spawn a particle of `kind` inside `bounds`.
    ///
    /// The initial population is spread over the full canvas height so the
    /// field starts full; later spawns enter just above the top edge.
    pub fn spawn<R: Rng + ?Sized>(kind: ParticleKind, bounds: Vec2, initial: bool, rng: &mut R) -> Self {
        let x = spread(rng, 0.0, bounds.x);
        let y = if initial { spread(rng, 0.0, bounds.y) } else { SPAWN_HEIGHT };

        match kind {
            ParticleKind::Rain => Self {
                position: Vec2::new(x, y),
                speed: spread(rng, 800.0, 400.0),
                opacity: spread(rng, 0.25, 0.25),
                motion: Motion::Rain {
                    length: spread(rng, 15.0, 12.0),
                    wind: spread(rng, 1.5, 1.5),
                    line_width: spread(rng, 0.75, 0.5),
                },
            },
            ParticleKind::Snow => Self {
                position: Vec2::new(x, y),
                speed: spread(rng, 40.0, 60.0),
                opacity: spread(rng, 0.4, 0.4),
                motion: Motion::Snow {
                    radius: spread(rng, 1.0, 2.5),
                    wobble: spread(rng, 0.0, TAU),
                    wobble_speed: spread(rng, 1.5, 1.0),
                },
            },
        }
    }

    #[inline]
    pub fn kind(&self) -> ParticleKind {
        match self.motion {
            Motion::Rain { .. } => ParticleKind::Rain,
            Motion::Snow { .. } => ParticleKind::Snow,
        }
    }

    /// Advance by `dt` seconds. Returns `false` once the particle has left
    /// the canvas and should be respawned.
    pub fn advance(&mut self, dt: f32, bounds: Vec2) -> bool {
        self.position.y += self.speed * dt;
        match &mut self.motion {
            Motion::Rain { wind, .. } => {
                self.position.x += *wind * 60.0 * dt;
            }
            Motion::Snow { wobble, wobble_speed, .. } => {
                *wobble += *wobble_speed * dt;
                self.position.x += wobble.sin() * 30.0 * dt;
            }
        }
        self.in_bounds(bounds)
    }

    #[inline]
    pub fn in_bounds(&self, bounds: Vec2) -> bool {
        let p = self.position;
        p.y <= bounds.y + EXIT_MARGIN && p.x <= bounds.x + EXIT_MARGIN && p.x >= -EXIT_MARGIN
    }

    /// Draw color: rain is tinted darker at night, snow is always white.
    pub fn color(&self, phase: Phase) -> Rgb {
        match self.motion {
            Motion::Rain { .. } if phase == Phase::Night => RAIN_NIGHT,
            Motion::Rain { .. } => RAIN_DAY,
            Motion::Snow { .. } => Rgb::WHITE,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const BOUNDS: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn test_rain_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let p = Particle::spawn(ParticleKind::Rain, BOUNDS, true, &mut rng);
            assert!((800.0..=1200.0).contains(&p.speed), "speed {}", p.speed);
            assert!((0.25..=0.5).contains(&p.opacity), "opacity {}", p.opacity);
            let Motion::Rain { length, wind, line_width } = p.motion else {
                panic!("expected rain motion");
            };
            assert!((15.0..=27.0).contains(&length));
            assert!((1.5..=3.0).contains(&wind));
            assert!((0.75..=1.25).contains(&line_width));
            assert!((0.0..=600.0).contains(&p.position.y));
        }
    }

    #[test]
    fn test_snow_ranges() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..500 {
            let p = Particle::spawn(ParticleKind::Snow, BOUNDS, false, &mut rng);
            assert_eq!(p.position.y, SPAWN_HEIGHT);
            assert!((40.0..=100.0).contains(&p.speed));
            assert!((0.4..=0.8).contains(&p.opacity));
            let Motion::Snow { radius, wobble, wobble_speed } = p.motion else {
                panic!("expected snow motion");
            };
            assert!((1.0..=3.5).contains(&radius));
            assert!((0.0..=TAU).contains(&wobble));
            assert!((1.5..=2.5).contains(&wobble_speed));
        }
    }

    #[test]
    fn test_rain_kinematics() {
        let mut p = Particle {
            position: Vec2::new(100.0, 100.0),
            speed: 1000.0,
            opacity: 0.3,
            motion: Motion::Rain { length: 20.0, wind: 2.0, line_width: 1.0 },
        };
        assert!(p.advance(0.05, BOUNDS));
        assert!((p.position.y - 150.0).abs() < 1e-3);
        assert!((p.position.x - 106.0).abs() < 1e-3);
    }

    #[test]
    fn test_snow_sways() {
        let mut p = Particle {
            position: Vec2::new(100.0, 100.0),
            speed: 50.0,
            opacity: 0.5,
            motion: Motion::Snow { radius: 2.0, wobble: 0.0, wobble_speed: 2.0 },
        };
        p.advance(0.05, BOUNDS);
        // wobble = 0.1, x += sin(0.1) * 30 * 0.05
        let expected = 100.0 + 0.1f32.sin() * 1.5;
        assert!((p.position.x - expected).abs() < 1e-4, "x = {}", p.position.x);
        assert!((p.position.y - 102.5).abs() < 1e-4);
    }

    #[test]
    fn test_exit_bounds() {
        let mut p = Particle::spawn(ParticleKind::Rain, BOUNDS, true, &mut StdRng::seed_from_u64(3));
        p.position = Vec2::new(400.0, 620.0);
        assert!(p.in_bounds(BOUNDS));
        p.position.y = 620.5;
        assert!(!p.in_bounds(BOUNDS));
        p.position = Vec2::new(-20.5, 10.0);
        assert!(!p.in_bounds(BOUNDS));
        p.position = Vec2::new(820.5, 10.0);
        assert!(!p.in_bounds(BOUNDS));
    }

    #[test]
    fn test_colors() {
        let mut rng = StdRng::seed_from_u64(4);
        let rain = Particle::spawn(ParticleKind::Rain, BOUNDS, true, &mut rng);
        let snow = Particle::spawn(ParticleKind::Snow, BOUNDS, true, &mut rng);
        assert_eq!(rain.color(Phase::Night), Rgb::new(140, 160, 190));
        assert_eq!(rain.color(Phase::Dusk), Rgb::new(170, 190, 210));
        assert_eq!(snow.color(Phase::Night), Rgb::WHITE);
        assert_eq!(rain.kind(), ParticleKind::Rain);
        assert_eq!(snow.kind(), ParticleKind::Snow);
    }

    #[test]
    fn test_zero_size_canvas_spawns() {
        let mut rng = StdRng::seed_from_u64(5);
        let p = Particle::spawn(ParticleKind::Snow, Vec2::ZERO, true, &mut rng);
        assert_eq!(p.position, Vec2::ZERO);
    }
}
