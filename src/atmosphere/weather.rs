//! WMO weather code → visual modifiers.
//!
//! Weather codes are resolved through an ordered rule table. Each rule
//! carries its category, base modifier values and an optional linear ramp
//! that scales blur, haze and convergence across the codes of its range
//! (e.g. light → dense drizzle). Cloud cover then modulates the result.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Discrete weather grouping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCategory {
    #[default]
    Clear,
    Partly,
    Overcast,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Storm,
}

impl WeatherCategory {
    /// Clear and partly-cloudy skies keep their solar look; everything
    /// heavier thickens the atmosphere with cloud cover.
    #[inline]
    pub fn is_light(self) -> bool {
        matches!(self, WeatherCategory::Clear | WeatherCategory::Partly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeatherCategory::Clear => "clear",
            WeatherCategory::Partly => "partly",
            WeatherCategory::Overcast => "overcast",
            WeatherCategory::Fog => "fog",
            WeatherCategory::Drizzle => "drizzle",
            WeatherCategory::Rain => "rain",
            WeatherCategory::Snow => "snow",
            WeatherCategory::Storm => "storm",
        }
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Continuous visual adjustments derived from weather.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherModifiers {
    /// Multiplier on the base animation speed.
    pub speed_multiplier: f32,
    /// Darken amount for the sky color `[0, 1]`.
    pub sky_darken: f32,
    /// Darken amount for cloud and cloud-shadow colors `[0, 1]`.
    pub cloud_darken: f32,
    /// Positive: blend clouds toward the sky color. Negative: darken clouds.
    pub blend_to_sky: f32,
    /// Darken amount for the sun colors `[0, 1]`.
    pub dim_sun: f32,
    /// Lighten amount for sunlight (and half for clouds) `[0, 1]`.
    pub soft_glow: f32,
    /// Cloud layer blur radius in pixels.
    pub blur: f32,
    /// Haze overlay opacity `[0, 1]`.
    pub haze_opacity: f32,
    /// How far palette colors converge on the neutral point `[0, 1]`.
    pub color_convergence: f32,
    /// Cloud layer opacity `[0, 1]`.
    pub cloud_opacity: f32,
    pub category: WeatherCategory,
}

/// Modifiers for codes no rule recognizes.
pub const NEUTRAL: WeatherModifiers = WeatherModifiers {
    speed_multiplier: 1.0,
    sky_darken: 0.0,
    cloud_darken: 0.0,
    blend_to_sky: 0.0,
    dim_sun: 0.0,
    soft_glow: 0.0,
    blur: 0.0,
    haze_opacity: 0.0,
    color_convergence: 0.0,
    cloud_opacity: 1.0,
    category: WeatherCategory::Clear,
};

impl Default for WeatherModifiers {
    fn default() -> Self {
        NEUTRAL
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// Change in blur, haze and convergence from the first to the last code of
/// a rule's range.
#[derive(Clone, Copy, Debug)]
struct Ramp {
    blur: f32,
    haze: f32,
    convergence: f32,
}

#[derive(Clone, Debug)]
struct WeatherRule {
    codes: RangeInclusive<u8>,
    base: WeatherModifiers,
    ramp: Option<Ramp>,
}

impl WeatherRule {
    fn resolve(&self, code: u8) -> WeatherModifiers {
        let mut m = self.base;
        if let Some(ramp) = self.ramp {
            let start = *self.codes.start();
            let width = (*self.codes.end() - start) as f32;
            let t = if width > 0.0 { (code - start) as f32 / width } else { 0.0 };
            m.blur += ramp.blur * t;
            m.haze_opacity += ramp.haze * t;
            m.color_convergence += ramp.convergence * t;
        }
        m
    }
}

static WEATHER_RULES: [WeatherRule; 14] = [
    // Clear sky
    WeatherRule {
        codes: 0..=0,
        base: WeatherModifiers {
            speed_multiplier: 0.4,
            blend_to_sky: 0.88,
            dim_sun: 0.12,
            category: WeatherCategory::Clear,
            ..NEUTRAL
        },
        ramp: None,
    },
    // Mainly clear
    WeatherRule {
        codes: 1..=1,
        base: WeatherModifiers {
            speed_multiplier: 0.5,
            blend_to_sky: 0.6,
            dim_sun: 0.05,
            color_convergence: 0.05,
            category: WeatherCategory::Partly,
            ..NEUTRAL
        },
        ramp: None,
    },
    // Partly cloudy
    WeatherRule {
        codes: 2..=2,
        base: WeatherModifiers {
            speed_multiplier: 0.7,
            blend_to_sky: 0.35,
            color_convergence: 0.1,
            category: WeatherCategory::Partly,
            ..NEUTRAL
        },
        ramp: None,
    },
    // Overcast
    WeatherRule {
        codes: 3..=3,
        base: WeatherModifiers {
            speed_multiplier: 0.8,
            soft_glow: 0.1,
            sky_darken: 0.05,
            blur: 6.0,
            haze_opacity: 0.35,
            color_convergence: 0.75,
            category: WeatherCategory::Overcast,
            ..NEUTRAL
        },
        ramp: None,
    },
    // Fog, depositing rime fog
    WeatherRule {
        codes: 45..=48,
        base: WeatherModifiers {
            speed_multiplier: 0.3,
            blend_to_sky: -0.2,
            soft_glow: 0.15,
            sky_darken: 0.08,
            blur: 12.0,
            haze_opacity: 0.85,
            color_convergence: 0.9,
            category: WeatherCategory::Fog,
            ..NEUTRAL
        },
        ramp: None,
    },
    // Drizzle: light, moderate, dense
    WeatherRule {
        codes: 51..=55,
        base: WeatherModifiers {
            speed_multiplier: 0.6,
            sky_darken: 0.1,
            soft_glow: 0.08,
            blur: 4.0,
            haze_opacity: 0.2,
            color_convergence: 0.55,
            category: WeatherCategory::Drizzle,
            ..NEUTRAL
        },
        ramp: Some(Ramp { blur: 1.0, haze: 0.05, convergence: 0.05 }),
    },
    // Freezing drizzle
    WeatherRule {
        codes: 56..=57,
        base: WeatherModifiers {
            speed_multiplier: 0.5,
            sky_darken: 0.12,
            cloud_darken: 0.05,
            blur: 5.0,
            haze_opacity: 0.25,
            color_convergence: 0.6,
            category: WeatherCategory::Drizzle,
            ..NEUTRAL
        },
        ramp: None,
    },
    // Rain: slight to moderate. Heavier rain keeps more cloud texture.
    WeatherRule {
        codes: 61..=63,
        base: WeatherModifiers {
            speed_multiplier: 1.0,
            sky_darken: 0.15,
            cloud_darken: 0.1,
            blur: 3.0,
            haze_opacity: 0.2,
            color_convergence: 0.35,
            category: WeatherCategory::Rain,
            ..NEUTRAL
        },
        ramp: Some(Ramp { blur: -1.0, haze: 0.05, convergence: 0.1 }),
    },
    // Heavy and freezing rain
    WeatherRule {
        codes: 65..=67,
        base: WeatherModifiers {
            speed_multiplier: 1.3,
            sky_darken: 0.25,
            cloud_darken: 0.18,
            blur: 2.0,
            haze_opacity: 0.2,
            color_convergence: 0.45,
            category: WeatherCategory::Rain,
            ..NEUTRAL
        },
        ramp: None,
    },
    // Snow: slight to heavy
    WeatherRule {
        codes: 71..=75,
        base: WeatherModifiers {
            speed_multiplier: 0.4,
            sky_darken: 0.05,
            soft_glow: 0.12,
            blend_to_sky: 0.2,
            blur: 6.0,
            haze_opacity: 0.35,
            color_convergence: 0.65,
            category: WeatherCategory::Snow,
            ..NEUTRAL
        },
        ramp: Some(Ramp { blur: 1.0, haze: 0.05, convergence: 0.05 }),
    },
    // Snow grains
    WeatherRule {
        codes: 77..=77,
        base: WeatherModifiers {
            speed_multiplier: 0.5,
            sky_darken: 0.1,
            blur: 6.0,
            haze_opacity: 0.35,
            color_convergence: 0.65,
            category: WeatherCategory::Snow,
            ..NEUTRAL
        },
        ramp: None,
    },
    // Rain showers
    WeatherRule {
        codes: 80..=82,
        base: WeatherModifiers {
            speed_multiplier: 1.2,
            sky_darken: 0.18,
            cloud_darken: 0.12,
            blur: 2.0,
            haze_opacity: 0.15,
            color_convergence: 0.3,
            category: WeatherCategory::Rain,
            ..NEUTRAL
        },
        ramp: Some(Ramp { blur: 1.0, haze: 0.1, convergence: 0.1 }),
    },
    // Snow showers
    WeatherRule {
        codes: 85..=86,
        base: WeatherModifiers {
            speed_multiplier: 0.6,
            sky_darken: 0.08,
            soft_glow: 0.1,
            blur: 6.0,
            haze_opacity: 0.35,
            color_convergence: 0.65,
            category: WeatherCategory::Snow,
            ..NEUTRAL
        },
        ramp: None,
    },
    // Thunderstorm
    WeatherRule {
        codes: 95..=u8::MAX,
        base: WeatherModifiers {
            speed_multiplier: 1.5,
            sky_darken: 0.35,
            cloud_darken: 0.25,
            blur: 1.0,
            haze_opacity: 0.08,
            color_convergence: 0.15,
            category: WeatherCategory::Storm,
            ..NEUTRAL
        },
        ramp: None,
    },
];

fn rule_for(code: u8) -> Option<&'static WeatherRule> {
    WEATHER_RULES.iter().find(|r| r.codes.contains(&code))
}

/// Category for a weather code, before any cloud-cover adjustment.
pub fn weather_category(code: u8) -> WeatherCategory {
    rule_for(code).map_or(WeatherCategory::Clear, |r| r.base.category)
}

/// Full modifier vector for a weather code and cloud cover percentage.
pub fn weather_modifiers(code: u8, cloud_cover: f32) -> WeatherModifiers {
    let cover = sanitize_cover(cloud_cover);
    let mut m = rule_for(code).map_or(NEUTRAL, |r| r.resolve(code));

    // Thin cloud still thins the atmosphere: 30% of the effect at 0% cover
    if !m.category.is_light() {
        let cloud_factor = 0.3 + (cover / 100.0) * 0.7;
        m.blur *= cloud_factor;
        m.haze_opacity *= cloud_factor;
        m.color_convergence *= cloud_factor;
    }

    if cover < 20.0 {
        m.blend_to_sky = m.blend_to_sky.max(0.7);
    } else if cover < 40.0 {
        m.blend_to_sky = m.blend_to_sky.max(0.4);
    } else if cover > 90.0 {
        m.sky_darken += 0.05;
        m.blend_to_sky = m.blend_to_sky.min(0.1);
    }

    m.cloud_opacity = cloud_opacity(code, cover);
    m
}

/// Cloud layer opacity for a weather code and cloud cover percentage.
pub fn cloud_opacity(code: u8, cloud_cover: f32) -> f32 {
    let cover = sanitize_cover(cloud_cover);
    match code {
        0 if cover < 20.0 => 0.15 + (cover / 20.0) * 0.3,
        0 => 0.45 + (cover / 100.0) * 0.55,
        1 if cover < 30.0 => 0.4 + (cover / 30.0) * 0.4,
        1 | 2 => (cover / 100.0) * 0.9 + 0.1,
        _ => cover / 100.0,
    }
}

fn sanitize_cover(cloud_cover: f32) -> f32 {
    if cloud_cover.is_nan() {
        0.0
    } else {
        cloud_cover.clamp(0.0, 100.0)
    }
}

// ---------------------------------------------------------------------------
// Precipitation
// ---------------------------------------------------------------------------

/// Kind of falling particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleKind {
    Rain,
    Snow,
}

/// What the particle field should be running.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleSpec {
    pub kind: ParticleKind,
    /// One of 0.3, 0.5, 0.6 or 1.0.
    pub intensity: f32,
}

impl ParticleSpec {
    /// Population size for this kind and intensity.
    pub fn count(&self) -> usize {
        let n = match self.kind {
            ParticleKind::Rain => 150.0 + self.intensity * 350.0,
            ParticleKind::Snow => 60.0 + self.intensity * 140.0,
        };
        n.floor() as usize
    }
}

const LIGHT_CODES: [u8; 8] = [51, 56, 61, 66, 71, 77, 80, 85];
const MODERATE_CODES: [u8; 4] = [53, 63, 73, 81];
const HEAVY_CODES: [u8; 10] = [55, 57, 65, 67, 75, 82, 86, 95, 96, 99];

/// Precipitation kind for a weather code, if any.
pub fn particle_kind(code: u8) -> Option<ParticleKind> {
    match code {
        51..=67 | 80..=82 | 95..=99 => Some(ParticleKind::Rain),
        71..=77 | 85..=86 => Some(ParticleKind::Snow),
        _ => None,
    }
}

/// Precipitation intensity for a weather code. Codes outside the explicit
/// lists fall back to 0.5.
pub fn particle_intensity(code: u8) -> f32 {
    if LIGHT_CODES.contains(&code) {
        0.3
    } else if MODERATE_CODES.contains(&code) {
        0.6
    } else if HEAVY_CODES.contains(&code) {
        1.0
    } else {
        0.5
    }
}

/// Particle kind and intensity together, or `None` for dry weather.
pub fn particle_spec(code: u8) -> Option<ParticleSpec> {
    particle_kind(code).map(|kind| ParticleSpec {
        kind,
        intensity: particle_intensity(code),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
