//! Per-tick frame state, query snapshot and renderer uniform.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::atmosphere::color::Rgb;
use crate::atmosphere::gradient::{weather_gradient, GradientStop};
use crate::atmosphere::sun::SunDirection;
use crate::atmosphere::waypoint::{BlendedSky, Palette, Phase};
use crate::atmosphere::weather::{WeatherCategory, WeatherModifiers};

/// Fraction of the viewport-independent blur kept on narrow viewports.
pub const NARROW_BLUR_SCALE: f32 = 0.6;

// ---------------------------------------------------------------------------
// Frame state
// ---------------------------------------------------------------------------

/// Everything one tick pushes to the renderer and surfaces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameState {
    pub phase: Phase,
    /// Sun altitude in degrees. Overrides report the angle they forced.
    pub sun_altitude: f32,
    pub sun_direction: SunDirection,
    /// Palette after weather adjustments.
    pub palette: Palette,
    /// Background gradient, top to bottom.
    pub gradient: Vec<GradientStop>,
    /// Blended solar theme color.
    pub theme_color: Rgb,
    pub neutral_point: Rgb,
    pub haze_color: Rgb,
    pub haze_opacity: f32,
    pub cloud_opacity: f32,
    /// Cloud layer blur in pixels.
    pub blur: f32,
    pub color_convergence: f32,
    /// Renderer animation speed.
    pub speed: f32,
    pub category: Option<WeatherCategory>,
}

impl FrameState {
    /// Apply weather modifiers to a blended solar sky.
    ///
    /// Adjustments run in a fixed order: sky darken, cloud darken,
    /// blend-to-sky, sun dim, soft glow, then convergence on the neutral
    /// point. `speed` is left as the weather multiplier (1 without weather);
    /// [`FrameState::constrain`] turns it into the final renderer speed.
    pub fn compose(
        sky: BlendedSky,
        sun_altitude: f32,
        sun_direction: SunDirection,
        weather: Option<&WeatherModifiers>,
    ) -> Self {
        let BlendedSky { phase, mut palette, gradient, theme_color, neutral_point, haze_color } = sky;

        let Some(m) = weather else {
            return Self {
                phase,
                sun_altitude,
                sun_direction,
                palette,
                gradient,
                theme_color,
                neutral_point,
                haze_color,
                haze_opacity: 0.0,
                cloud_opacity: 1.0,
                blur: 0.0,
                color_convergence: 0.0,
                speed: 1.0,
                category: None,
            };
        };

        if m.sky_darken > 0.0 {
            palette.sky = palette.sky.darken(m.sky_darken);
        }
        if m.cloud_darken > 0.0 {
            palette.cloud = palette.cloud.darken(m.cloud_darken);
            palette.cloud_shadow = palette.cloud_shadow.darken(m.cloud_darken);
        }
        if m.blend_to_sky > 0.0 {
            palette.cloud = palette.cloud.blend(palette.sky, m.blend_to_sky);
            palette.cloud_shadow = palette.cloud_shadow.blend(palette.sky, m.blend_to_sky * 0.5);
        } else if m.blend_to_sky < 0.0 {
            palette.cloud = palette.cloud.darken(-m.blend_to_sky * 0.3);
        }
        if m.dim_sun > 0.0 {
            palette.sun = palette.sun.darken(m.dim_sun);
            palette.sun_glare = palette.sun_glare.darken(m.dim_sun * 1.5);
            palette.sunlight = palette.sunlight.darken(m.dim_sun);
        }
        if m.soft_glow > 0.0 {
            palette.sunlight = palette.sunlight.lighten(m.soft_glow);
            palette.cloud = palette.cloud.lighten(m.soft_glow * 0.5);
        }
        let c = m.color_convergence;
        if c > 0.0 {
            palette.sky = palette.sky.blend(neutral_point, c);
            palette.cloud = palette.cloud.blend(neutral_point, c * 0.5);
            palette.cloud_shadow = palette.cloud_shadow.blend(neutral_point, c * 0.5);
            palette.sun = palette.sun.blend(neutral_point, c);
            palette.sun_glare = palette.sun_glare.blend(neutral_point, c);
            palette.sunlight = palette.sunlight.blend(neutral_point, c);
        }

        let gradient = match weather_gradient(m.category, phase) {
            Some(stops) => stops.to_vec(),
            None => gradient,
        };

        Self {
            phase,
            sun_altitude,
            sun_direction,
            palette,
            gradient,
            theme_color,
            neutral_point,
            haze_color,
            haze_opacity: m.haze_opacity,
            cloud_opacity: m.cloud_opacity,
            blur: m.blur,
            color_convergence: c,
            speed: m.speed_multiplier,
            category: Some(m.category),
        }
    }

    /// Fold in device constraints: narrow viewports get less blur and the
    /// speed multiplier is scaled by `speed_baseline` (0 for reduced motion).
    pub fn constrain(&mut self, narrow_viewport: bool, speed_baseline: f32) {
        if narrow_viewport {
            self.blur *= NARROW_BLUR_SCALE;
        }
        self.speed *= speed_baseline;
    }

    /// Payload for the external cloud renderer.
    #[inline]
    pub fn uniform(&self) -> CloudUniform {
        CloudUniform::from(self)
    }
}

// ---------------------------------------------------------------------------
// Query snapshot
// ---------------------------------------------------------------------------

/// Read-only snapshot returned by `SkyEffect::state`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkyState {
    /// `None` until the first tick.
    pub phase: Option<Phase>,
    pub sun_altitude: f32,
    pub sun_direction: SunDirection,
    pub weather_code: Option<u8>,
    pub cloud_cover: Option<f32>,
    pub temperature: Option<f32>,
    pub is_daytime: bool,
    pub paused: bool,
    pub category: Option<WeatherCategory>,
    pub blur: f32,
    pub haze_opacity: f32,
    pub color_convergence: f32,
}

// ---------------------------------------------------------------------------
// Renderer uniform
// ---------------------------------------------------------------------------

/// Cloud renderer payload: the six palette colors plus opacity and speed.
///
/// Colors are normalized RGBA with alpha fixed at 1; the struct is 16-byte
/// aligned for direct GPU upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CloudUniform {
    pub sky_color: [f32; 4],
    pub cloud_color: [f32; 4],
    pub cloud_shadow_color: [f32; 4],
    pub sun_color: [f32; 4],
    pub sun_glare_color: [f32; 4],
    pub sunlight_color: [f32; 4],

    // -- 16 bytes --
    pub cloud_opacity: f32,
    pub speed: f32,
    pub _pad: [f32; 2],
}

fn rgba(c: Rgb) -> [f32; 4] {
    let [r, g, b] = c.to_linear();
    [r, g, b, 1.0]
}

impl From<&FrameState> for CloudUniform {
    fn from(f: &FrameState) -> Self {
        let p = &f.palette;
        Self {
            sky_color: rgba(p.sky),
            cloud_color: rgba(p.cloud),
            cloud_shadow_color: rgba(p.cloud_shadow),
            sun_color: rgba(p.sun),
            sun_glare_color: rgba(p.sun_glare),
            sunlight_color: rgba(p.sunlight),
            cloud_opacity: f.cloud_opacity,
            speed: f.speed,
            _pad: [0.0; 2],
        }
    }
}

impl CloudUniform {
    /// Same payload with a different speed. Used to stop and restart
    /// animation without recomputing the frame.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::waypoint::sample_sky;
    use crate::atmosphere::weather::weather_modifiers;

    #[test]
    fn test_uniform_size_and_alignment() {
        assert_eq!(std::mem::size_of::<CloudUniform>(), 112);
        assert_eq!(std::mem::size_of::<CloudUniform>() % 16, 0);
        let u = CloudUniform::zeroed();
        assert_eq!(bytemuck::bytes_of(&u).len(), 112);
    }

    #[test]
    fn test_compose_without_weather_keeps_solar_palette() {
        let sky = sample_sky(15.0, SunDirection::Morning);
        let frame = FrameState::compose(sky.clone(), 15.0, SunDirection::Morning, None);
        assert_eq!(frame.palette, sky.palette);
        assert_eq!(frame.gradient, sky.gradient);
        assert_eq!(frame.category, None);
        assert_eq!(frame.haze_opacity, 0.0);
        assert_eq!(frame.speed, 1.0);
    }

    #[test]
    fn test_compose_uses_weather_gradient() {
        let sky = sample_sky(15.0, SunDirection::Morning);
        let m = weather_modifiers(3, 80.0);
        let frame = FrameState::compose(sky, 15.0, SunDirection::Morning, Some(&m));
        let expected = weather_gradient(WeatherCategory::Overcast, Phase::Day).unwrap();
        assert_eq!(frame.gradient, expected.to_vec());
        assert_eq!(frame.category, Some(WeatherCategory::Overcast));
    }

    #[test]
    fn test_clear_weather_keeps_solar_gradient() {
        let sky = sample_sky(15.0, SunDirection::Morning);
        let m = weather_modifiers(0, 10.0);
        let frame = FrameState::compose(sky.clone(), 15.0, SunDirection::Morning, Some(&m));
        assert_eq!(frame.gradient, sky.gradient);
        // Clear sky blends clouds toward the sky and dims the sun
        assert_ne!(frame.palette.cloud, sky.palette.cloud);
        assert_ne!(frame.palette.sun_glare, sky.palette.sun_glare);
    }

    #[test]
    fn test_convergence_pulls_sky_toward_neutral() {
        let sky = sample_sky(15.0, SunDirection::Morning);
        let neutral = sky.neutral_point;
        let before = sky.palette.sky;
        let m = weather_modifiers(45, 100.0);
        let frame = FrameState::compose(sky, 15.0, SunDirection::Morning, Some(&m));
        let dist = |c: Rgb| {
            (c.r as i32 - neutral.r as i32).abs()
                + (c.g as i32 - neutral.g as i32).abs()
                + (c.b as i32 - neutral.b as i32).abs()
        };
        assert!(
            dist(frame.palette.sky) <= dist(before),
            "sky {} should be closer to {} than {}",
            frame.palette.sky,
            neutral,
            before
        );
    }

    #[test]
    fn test_constrain_narrow_and_reduced_motion() {
        let sky = sample_sky(15.0, SunDirection::Morning);
        let m = weather_modifiers(3, 100.0);
        let mut frame = FrameState::compose(sky, 15.0, SunDirection::Morning, Some(&m));
        let blur = frame.blur;
        frame.constrain(true, 0.3);
        assert!((frame.blur - blur * 0.6).abs() < 1e-5);
        assert!((frame.speed - 0.8 * 0.3).abs() < 1e-5);
        frame.constrain(false, 0.0);
        assert_eq!(frame.speed, 0.0);
    }

    #[test]
    fn test_uniform_carries_palette() {
        let sky = sample_sky(15.0, SunDirection::Morning);
        let frame = FrameState::compose(sky, 15.0, SunDirection::Morning, None);
        let u = frame.uniform();
        assert_eq!(u.sky_color[3], 1.0);
        assert_eq!(u.sky_color[0], frame.palette.sky.r as f32 / 255.0);
        assert_eq!(u.with_speed(0.0).speed, 0.0);
        assert_eq!(u.cloud_opacity, 1.0);
    }
}
