//! Sun-angle waypoints and their piecewise-linear blend.
//!
//! Each direction (morning, evening) has its own immutable table of visual
//! states keyed by solar altitude. Sampling a table brackets the angle
//! between two waypoints and blends every color channel linearly; the phase
//! is categorical and switches at the midpoint of each segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::atmosphere::color::{Lerp, Rgb};
use crate::atmosphere::gradient::GradientStop;
use crate::atmosphere::sun::SunDirection;

/// Number of gradient stops every waypoint carries.
pub const WAYPOINT_STOPS: usize = 4;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Categorical time of day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Night,
    Dawn,
    Day,
    Dusk,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Night, Phase::Dawn, Phase::Day, Phase::Dusk];

    /// Day and dawn count as daytime.
    #[inline]
    pub fn is_daytime(self) -> bool {
        matches!(self, Phase::Day | Phase::Dawn)
    }

    /// Representative sun angle and direction used when a caller pins the
    /// time of day instead of tracking the real sun.
    pub fn anchor(self) -> (f32, SunDirection) {
        match self {
            Phase::Night => (-18.0, SunDirection::Evening),
            Phase::Dawn => (-1.0, SunDirection::Morning),
            Phase::Day => (15.0, SunDirection::Morning),
            Phase::Dusk => (-1.0, SunDirection::Evening),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Night => "night",
            Phase::Dawn => "dawn",
            Phase::Day => "day",
            Phase::Dusk => "dusk",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "night" => Ok(Phase::Night),
            "dawn" => Ok(Phase::Dawn),
            "day" => Ok(Phase::Day),
            "dusk" => Ok(Phase::Dusk),
            other => Err(format!("unknown time of day '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// The six colors handed to the cloud renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub sky: Rgb,
    pub cloud: Rgb,
    pub cloud_shadow: Rgb,
    pub sun: Rgb,
    pub sun_glare: Rgb,
    pub sunlight: Rgb,
}

impl Palette {
    pub const fn hex(sky: u32, cloud: u32, cloud_shadow: u32, sun: u32, sun_glare: u32, sunlight: u32) -> Self {
        Self {
            sky: Rgb::hex(sky),
            cloud: Rgb::hex(cloud),
            cloud_shadow: Rgb::hex(cloud_shadow),
            sun: Rgb::hex(sun),
            sun_glare: Rgb::hex(sun_glare),
            sunlight: Rgb::hex(sunlight),
        }
    }

    /// Colors in renderer order: sky, cloud, cloud shadow, sun, glare, sunlight.
    pub fn colors(&self) -> [Rgb; 6] {
        [self.sky, self.cloud, self.cloud_shadow, self.sun, self.sun_glare, self.sunlight]
    }
}

impl Lerp for Palette {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            sky: self.sky.blend(other.sky, t),
            cloud: self.cloud.blend(other.cloud, t),
            cloud_shadow: self.cloud_shadow.blend(other.cloud_shadow, t),
            sun: self.sun.blend(other.sun, t),
            sun_glare: self.sun_glare.blend(other.sun_glare, t),
            sunlight: self.sunlight.blend(other.sunlight, t),
        }
    }
}

// ---------------------------------------------------------------------------
// Waypoint
// ---------------------------------------------------------------------------

/// A fixed visual state anchored at one solar altitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    /// Solar altitude in degrees.
    pub angle: f32,
    pub phase: Phase,
    pub palette: Palette,
    pub gradient: [GradientStop; WAYPOINT_STOPS],
    pub theme_color: Rgb,
    /// Color that weather convergence pulls the palette toward.
    pub neutral_point: Rgb,
    pub haze_color: Rgb,
}

/// A waypoint-derived visual state, owned by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendedSky {
    pub phase: Phase,
    pub palette: Palette,
    pub gradient: Vec<GradientStop>,
    pub theme_color: Rgb,
    pub neutral_point: Rgb,
    pub haze_color: Rgb,
}

impl From<&Waypoint> for BlendedSky {
    fn from(w: &Waypoint) -> Self {
        Self {
            phase: w.phase,
            palette: w.palette,
            gradient: w.gradient.to_vec(),
            theme_color: w.theme_color,
            neutral_point: w.neutral_point,
            haze_color: w.haze_color,
        }
    }
}

/// Blend two waypoints at `t` in `[0, 1]`.
///
/// The phase snaps to the lower waypoint below 0.5 and to the upper one from
/// 0.5 on. Endpoints return exact copies.
pub fn blend_waypoints(lower: &Waypoint, upper: &Waypoint, t: f32) -> BlendedSky {
    if t == 0.0 {
        return BlendedSky::from(lower);
    }
    if t == 1.0 {
        return BlendedSky::from(upper);
    }

    BlendedSky {
        phase: if t < 0.5 { lower.phase } else { upper.phase },
        palette: lower.palette.lerp(&upper.palette, t),
        gradient: lower
            .gradient
            .iter()
            .zip(upper.gradient.iter())
            .map(|(a, b)| a.lerp(b, t))
            .collect(),
        theme_color: lower.theme_color.blend(upper.theme_color, t),
        neutral_point: lower.neutral_point.blend(upper.neutral_point, t),
        haze_color: lower.haze_color.blend(upper.haze_color, t),
    }
}

// ---------------------------------------------------------------------------
// WaypointTable
// ---------------------------------------------------------------------------

/// Two waypoints bracketing an angle and the blend factor between them.
#[derive(Clone, Copy, Debug)]
pub struct Bracket<'a> {
    pub lower: &'a Waypoint,
    pub upper: &'a Waypoint,
    pub t: f32,
}

/// Sorted, immutable waypoint table for one sun direction.
#[derive(Debug)]
pub struct WaypointTable {
    waypoints: &'static [Waypoint],
}

impl WaypointTable {
    /// Table for the given direction.
    pub fn for_direction(direction: SunDirection) -> &'static WaypointTable {
        match direction {
            SunDirection::Morning => &MORNING,
            SunDirection::Evening => &EVENING,
        }
    }

    #[inline]
    pub fn waypoints(&self) -> &'static [Waypoint] {
        self.waypoints
    }

    /// Find the waypoints around `angle`.
    ///
    /// Angles at or beyond either end clamp to that end with `t = 0`; there
    /// is no extrapolation.
    pub fn bracket(&self, angle: f32) -> Bracket<'static> {
        let wps = self.waypoints;
        let first = &wps[0];
        let last = &wps[wps.len() - 1];

        if angle <= first.angle {
            return Bracket { lower: first, upper: first, t: 0.0 };
        }
        if angle >= last.angle {
            return Bracket { lower: last, upper: last, t: 0.0 };
        }

        for pair in wps.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if angle >= a.angle && angle < b.angle {
                let range = b.angle - a.angle;
                let t = if range > 0.0 { (angle - a.angle) / range } else { 0.0 };
                return Bracket { lower: a, upper: b, t };
            }
        }

        // Only reachable with NaN input
        Bracket { lower: last, upper: last, t: 0.0 }
    }

    /// Blended visual state at `angle`.
    pub fn sample(&self, angle: f32) -> BlendedSky {
        let b = self.bracket(angle);
        blend_waypoints(b.lower, b.upper, b.t)
    }
}

/// Blend the table for `direction` at `angle`.
pub fn sample_sky(angle: f32, direction: SunDirection) -> BlendedSky {
    WaypointTable::for_direction(direction).sample(angle)
}

// ---------------------------------------------------------------------------
// Static tables
// ---------------------------------------------------------------------------

const fn stops(a: u32, b: u32, c: u32, d: u32) -> [GradientStop; WAYPOINT_STOPS] {
    [
        GradientStop::hex(a, 0.0),
        GradientStop::hex(b, 33.0),
        GradientStop::hex(c, 67.0),
        GradientStop::hex(d, 100.0),
    ]
}

const fn rgb(r: u8, g: u8, b: u8) -> Rgb {
    Rgb::new(r, g, b)
}

// Morning: cooler, rose-tinted tones
static MORNING_WAYPOINTS: [Waypoint; 7] = [
    Waypoint {
        angle: -18.0,
        phase: Phase::Night,
        palette: Palette::hex(0x0a1628, 0x1a2a4a, 0x050a14, 0x8899aa, 0x334455, 0x6677aa),
        gradient: stops(0x0a1628, 0x111e38, 0x1a2a4a, 0x2a3a5a),
        theme_color: Rgb::hex(0x0a1628),
        neutral_point: Rgb::hex(0x1a1e25),
        haze_color: rgb(22, 26, 34),
    },
    Waypoint {
        angle: -12.0,
        phase: Phase::Night,
        palette: Palette::hex(0x0e1a30, 0x1e2e50, 0x080e1a, 0x8899aa, 0x3a4a5a, 0x6a7aaa),
        gradient: stops(0x0e1a30, 0x151f3c, 0x1e2e50, 0x2e3e5e),
        theme_color: Rgb::hex(0x0e1a30),
        neutral_point: Rgb::hex(0x1c2028),
        haze_color: rgb(26, 30, 40),
    },
    Waypoint {
        angle: -6.0,
        phase: Phase::Dawn,
        palette: Palette::hex(0x2a2848, 0x4a4068, 0x181430, 0x9080a0, 0x6a5878, 0x8878a0),
        gradient: stops(0x1a1838, 0x2a2848, 0x3a3558, 0x5a4a6a),
        theme_color: Rgb::hex(0x2a2848),
        neutral_point: Rgb::hex(0x4a4058),
        haze_color: rgb(60, 55, 75),
    },
    Waypoint {
        angle: -1.0,
        phase: Phase::Dawn,
        palette: Palette::hex(0x4a3a5c, 0xb88878, 0x2a1a3c, 0xd4a080, 0xc07060, 0xd0a888),
        gradient: stops(0xd09080, 0xa87068, 0x4a3a5c, 0x2a1a3c),
        theme_color: Rgb::hex(0xd09080),
        neutral_point: Rgb::hex(0x8a7570),
        haze_color: rgb(140, 120, 115),
    },
    Waypoint {
        angle: 1.0,
        phase: Phase::Dawn,
        palette: Palette::hex(0x6a6888, 0xc8a088, 0x3a3050, 0xdab888, 0xc88868, 0xd8b898),
        gradient: stops(0xe0a888, 0xc09078, 0x7a7090, 0x5a5878),
        theme_color: Rgb::hex(0xe0a888),
        neutral_point: Rgb::hex(0x9a8878),
        haze_color: rgb(160, 138, 125),
    },
    Waypoint {
        angle: 6.0,
        phase: Phase::Day,
        palette: Palette::hex(0x5898b8, 0x98aab8, 0x487090, 0xc8b8a0, 0xb09880, 0xc0b098),
        gradient: stops(0x5898b8, 0x70a8c4, 0x88bcd0, 0xa0d0e0),
        theme_color: Rgb::hex(0x5898b8),
        neutral_point: Rgb::hex(0x98a0a4),
        haze_color: rgb(155, 162, 168),
    },
    Waypoint {
        angle: 15.0,
        phase: Phase::Day,
        palette: Palette::hex(0x5a9fc8, 0x88aaba, 0x4a7a98, 0xc8c0a8, 0xa89880, 0xb8b0a0),
        gradient: stops(0x4a90c2, 0x6eb5d9, 0x7ac4e4, 0x87ceeb),
        theme_color: Rgb::hex(0x4a90c2),
        neutral_point: Rgb::hex(0xa0a5a8),
        haze_color: rgb(170, 175, 180),
    },
];

// Evening: warmer amber and orange tones
static EVENING_WAYPOINTS: [Waypoint; 7] = [
    Waypoint {
        angle: -18.0,
        phase: Phase::Night,
        palette: Palette::hex(0x0a1628, 0x1a2a4a, 0x050a14, 0x8899aa, 0x334455, 0x6677aa),
        gradient: stops(0x0a1628, 0x111e38, 0x1a2a4a, 0x2a3a5a),
        theme_color: Rgb::hex(0x0a1628),
        neutral_point: Rgb::hex(0x1a1e25),
        haze_color: rgb(22, 26, 34),
    },
    Waypoint {
        angle: -12.0,
        phase: Phase::Night,
        palette: Palette::hex(0x10182e, 0x202a48, 0x0a0e18, 0x8a8898, 0x3e4456, 0x6e7498),
        gradient: stops(0x10182e, 0x181e3a, 0x202a48, 0x303a56),
        theme_color: Rgb::hex(0x10182e),
        neutral_point: Rgb::hex(0x1e2028),
        haze_color: rgb(28, 30, 38),
    },
    Waypoint {
        angle: -6.0,
        phase: Phase::Dusk,
        palette: Palette::hex(0x302840, 0x584860, 0x1a1428, 0x987888, 0x785868, 0x907090),
        gradient: stops(0x201830, 0x302840, 0x483858, 0x604a68),
        theme_color: Rgb::hex(0x302840),
        neutral_point: Rgb::hex(0x504050),
        haze_color: rgb(65, 55, 68),
    },
    Waypoint {
        angle: -1.0,
        phase: Phase::Dusk,
        palette: Palette::hex(0x5c4a6a, 0xc88850, 0x2a1a3c, 0xd08050, 0xc05838, 0xd09060),
        gradient: stops(0xd87848, 0xb06840, 0x5c4a6a, 0x2a1a3c),
        theme_color: Rgb::hex(0xd87848),
        neutral_point: Rgb::hex(0x7a6a68),
        haze_color: rgb(125, 108, 105),
    },
    Waypoint {
        angle: 1.0,
        phase: Phase::Dusk,
        palette: Palette::hex(0x7a6880, 0xd09058, 0x382848, 0xd89058, 0xc86840, 0xd8a068),
        gradient: stops(0xe88850, 0xc87848, 0x886878, 0x5c5068),
        theme_color: Rgb::hex(0xe88850),
        neutral_point: Rgb::hex(0x887870),
        haze_color: rgb(148, 118, 108),
    },
    Waypoint {
        angle: 6.0,
        phase: Phase::Day,
        palette: Palette::hex(0x5898b8, 0x98a8b4, 0x487090, 0xc8b898, 0xb09478, 0xc0ac90),
        gradient: stops(0x5898b8, 0x70a8c4, 0x88bcd0, 0xa0d0e0),
        theme_color: Rgb::hex(0x5898b8),
        neutral_point: Rgb::hex(0x98a0a4),
        haze_color: rgb(155, 162, 168),
    },
    Waypoint {
        angle: 15.0,
        phase: Phase::Day,
        palette: Palette::hex(0x5a9fc8, 0x88aaba, 0x4a7a98, 0xc8c0a8, 0xa89880, 0xb8b0a0),
        gradient: stops(0x4a90c2, 0x6eb5d9, 0x7ac4e4, 0x87ceeb),
        theme_color: Rgb::hex(0x4a90c2),
        neutral_point: Rgb::hex(0xa0a5a8),
        haze_color: rgb(170, 175, 180),
    },
];

pub static MORNING: WaypointTable = WaypointTable { waypoints: &MORNING_WAYPOINTS };
pub static EVENING: WaypointTable = WaypointTable { waypoints: &EVENING_WAYPOINTS };

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
