//! Sky gradients: stops, weather-category tables and CSS output.

use serde::{Deserialize, Serialize};

use crate::atmosphere::color::{Lerp, Rgb};
use crate::atmosphere::waypoint::Phase;
use crate::atmosphere::weather::WeatherCategory;

/// Haze overlay alpha at 0%, 30%, 60% and 100% of the height.
const HAZE_ALPHAS: [(f32, u32); 4] = [(0.95, 0), (0.9, 30), (0.85, 60), (0.8, 100)];

/// One color stop of a top-to-bottom gradient.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub color: Rgb,
    /// Position in percent, 0 at the top.
    pub position: f32,
}

impl GradientStop {
    pub const fn hex(color: u32, position: f32) -> Self {
        Self { color: Rgb::hex(color), position }
    }
}

/// Color and position blend independently; the position lands on a whole
/// percent.
impl Lerp for GradientStop {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            color: self.color.blend(other.color, t),
            position: self.position.lerp(&other.position, t).round(),
        }
    }
}

/// `linear-gradient(to bottom, #rrggbb p%, ...)`
pub fn gradient_css(stops: &[GradientStop]) -> String {
    let parts: Vec<String> = stops
        .iter()
        .map(|s| format!("{} {}%", s.color, s.position))
        .collect();
    format!("linear-gradient(to bottom, {})", parts.join(", "))
}

/// Translucent top-to-bottom haze in a single color.
pub fn haze_css(color: Rgb) -> String {
    let parts: Vec<String> = HAZE_ALPHAS
        .iter()
        .map(|&(alpha, pos)| format!("{} {}%", color.to_rgba_css(alpha), pos))
        .collect();
    format!("linear-gradient(to bottom, {})", parts.join(", "))
}

// ---------------------------------------------------------------------------
// Weather tables
// ---------------------------------------------------------------------------

/// Gradient and theme color for one weather category at each phase.
struct WeatherLook {
    night: [GradientStop; 3],
    dawn: [GradientStop; 3],
    day: [GradientStop; 3],
    dusk: [GradientStop; 3],
}

impl WeatherLook {
    fn stops(&self, phase: Phase) -> &[GradientStop; 3] {
        match phase {
            Phase::Night => &self.night,
            Phase::Dawn => &self.dawn,
            Phase::Day => &self.day,
            Phase::Dusk => &self.dusk,
        }
    }
}

const fn day_stops(a: u32, b: u32, c: u32) -> [GradientStop; 3] {
    [GradientStop::hex(a, 0.0), GradientStop::hex(b, 40.0), GradientStop::hex(c, 100.0)]
}

const fn night_stops(a: u32, b: u32, c: u32) -> [GradientStop; 3] {
    [GradientStop::hex(a, 0.0), GradientStop::hex(b, 50.0), GradientStop::hex(c, 100.0)]
}

static OVERCAST: WeatherLook = WeatherLook {
    day: day_stops(0x8a9098, 0x979da4, 0xa8aeb5),
    night: night_stops(0x1a1e24, 0x252a30, 0x303840),
    dawn: day_stops(0x9a8880, 0x908888, 0x8a9098),
    dusk: day_stops(0x8a7870, 0x888080, 0x8a9098),
};

static FOG: WeatherLook = WeatherLook {
    day: day_stops(0xb0b4b8, 0xbabec2, 0xc8ccd0),
    night: night_stops(0x202428, 0x2a2e34, 0x383e48),
    dawn: day_stops(0xb0a098, 0xa8a0a0, 0xb0b4b8),
    dusk: day_stops(0xa89890, 0xa09898, 0xb0b4b8),
};

static DRIZZLE: WeatherLook = WeatherLook {
    day: day_stops(0x7a8490, 0x8a929c, 0x98a0a8),
    night: night_stops(0x161a20, 0x1e2228, 0x282e38),
    dawn: day_stops(0x907870, 0x887878, 0x7a8490),
    dusk: day_stops(0x806868, 0x787070, 0x7a8490),
};

static RAIN: WeatherLook = WeatherLook {
    day: day_stops(0x606870, 0x707880, 0x808890),
    night: night_stops(0x101418, 0x181c22, 0x222830),
    dawn: day_stops(0x786860, 0x706868, 0x606870),
    dusk: day_stops(0x685858, 0x605858, 0x606870),
};

static SNOW: WeatherLook = WeatherLook {
    day: day_stops(0xa0a8b0, 0xb0b8c0, 0xc0c8d0),
    night: night_stops(0x1e2230, 0x283040, 0x384050),
    dawn: day_stops(0xb0a0a0, 0xa8a0a8, 0xa0a8b0),
    dusk: day_stops(0xa09098, 0x989098, 0xa0a8b0),
};

static STORM: WeatherLook = WeatherLook {
    day: day_stops(0x404850, 0x505860, 0x606870),
    night: night_stops(0x080a10, 0x101418, 0x1a2028),
    dawn: day_stops(0x584840, 0x504848, 0x404850),
    dusk: day_stops(0x483838, 0x403838, 0x404850),
};

fn look(category: WeatherCategory) -> Option<&'static WeatherLook> {
    match category {
        WeatherCategory::Clear | WeatherCategory::Partly => None,
        WeatherCategory::Overcast => Some(&OVERCAST),
        WeatherCategory::Fog => Some(&FOG),
        WeatherCategory::Drizzle => Some(&DRIZZLE),
        WeatherCategory::Rain => Some(&RAIN),
        WeatherCategory::Snow => Some(&SNOW),
        WeatherCategory::Storm => Some(&STORM),
    }
}

/// Background gradient that replaces the solar gradient under this weather,
/// if the category has one.
pub fn weather_gradient(category: WeatherCategory, phase: Phase) -> Option<&'static [GradientStop]> {
    look(category).map(|l| &l.stops(phase)[..])
}

/// Browser theme color for this weather: the top stop of its gradient.
pub fn weather_theme_color(category: WeatherCategory, phase: Phase) -> Option<Rgb> {
    look(category).map(|l| l.stops(phase)[0].color)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_css() {
        let stops = [GradientStop::hex(0x4a90c2, 0.0), GradientStop::hex(0x87ceeb, 100.0)];
        assert_eq!(
            gradient_css(&stops),
            "linear-gradient(to bottom, #4a90c2 0%, #87ceeb 100%)"
        );
    }

    #[test]
    fn test_haze_css() {
        let css = haze_css(Rgb::new(170, 175, 180));
        assert!(css.starts_with("linear-gradient(to bottom, rgba(170, 175, 180, 0.95) 0%"));
        assert!(css.ends_with("rgba(170, 175, 180, 0.8) 100%)"));
    }

    #[test]
    fn test_stop_lerp_rounds_position() {
        let a = GradientStop::hex(0x000000, 30.0);
        let b = GradientStop::hex(0xffffff, 41.0);
        let m = a.lerp(&b, 0.5);
        assert_eq!(m.position, 36.0);
    }

    #[test]
    fn test_clear_and_partly_have_no_weather_gradient() {
        for phase in Phase::ALL {
            assert!(weather_gradient(WeatherCategory::Clear, phase).is_none());
            assert!(weather_gradient(WeatherCategory::Partly, phase).is_none());
            assert!(weather_theme_color(WeatherCategory::Partly, phase).is_none());
        }
    }

    #[test]
    fn test_every_heavy_category_has_all_phases() {
        for cat in [
            WeatherCategory::Overcast,
            WeatherCategory::Fog,
            WeatherCategory::Drizzle,
            WeatherCategory::Rain,
            WeatherCategory::Snow,
            WeatherCategory::Storm,
        ] {
            for phase in Phase::ALL {
                let stops = weather_gradient(cat, phase).expect("missing gradient");
                assert_eq!(stops.len(), 3);
                assert_eq!(stops[0].position, 0.0);
                assert_eq!(stops[2].position, 100.0);
            }
        }
    }

    #[test]
    fn test_weather_theme_matches_table() {
        assert_eq!(
            weather_theme_color(WeatherCategory::Rain, Phase::Night),
            Some(Rgb::hex(0x101418))
        );
        assert_eq!(
            weather_theme_color(WeatherCategory::Storm, Phase::Dusk),
            Some(Rgb::hex(0x483838))
        );
    }
}
