//! Solar and weather driven sky appearance.
//!
//! Sun position picks a blend of waypoint palettes ([`waypoint`]); weather
//! codes map to continuous modifiers ([`weather`]) that are applied on top
//! of that palette to produce a [`FrameState`].

pub mod color;
pub mod config;
pub mod gradient;
pub mod state;
pub mod sun;
pub mod waypoint;
pub mod weather;

// Re-exports
pub use color::{Lerp, Rgb};
pub use config::SkyConfig;
pub use gradient::{gradient_css, haze_css, weather_gradient, weather_theme_color, GradientStop};
pub use state::{CloudUniform, FrameState, SkyState};
pub use sun::{solar_altitude, SunDirection};
pub use waypoint::{blend_waypoints, sample_sky, BlendedSky, Palette, Phase, Waypoint, WaypointTable};
pub use weather::{
    cloud_opacity, particle_intensity, particle_kind, particle_spec, weather_category, weather_modifiers,
    ParticleKind, ParticleSpec, WeatherCategory, WeatherModifiers,
};
