//! Skyscape - a weather-reactive animated sky

pub mod core;
pub mod atmosphere;
pub mod particles;
pub mod render;
pub mod source;
pub mod driver;

pub use atmosphere::{FrameState, Phase, SkyConfig, SkyState, SunDirection};
pub use render::{SkyEffect, SkyEffectBuilder};
pub use source::{WeatherOverride, WeatherSnapshot};
