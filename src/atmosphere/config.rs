//! Sky effect configuration.

use std::path::Path;
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Default sunrise, 07:30 as minutes of day.
pub const DEFAULT_SUNRISE: u32 = 7 * 60 + 30;
/// Default sunset, 17:30 as minutes of day.
pub const DEFAULT_SUNSET: u32 = 17 * 60 + 30;

const MINUTES_PER_DAY: u32 = 24 * 60;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Full sky effect configuration. Every field has a default, so a JSON
/// document only needs the keys it wants to change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// Latitude in degrees, north positive.
    pub latitude: f64,
    /// Longitude in degrees, east positive.
    pub longitude: f64,
    /// IANA zone name passed through to the weather service.
    pub timezone: String,
    /// Offset from UTC used to derive local minutes-of-day and calendar date.
    pub utc_offset_minutes: i32,

    // -- Animation ---------------------------------------------------------

    /// Renderer speed baseline on wide viewports.
    pub base_speed: f32,
    /// Renderer speed baseline on narrow viewports.
    pub mobile_speed: f32,
    /// Viewport width (px) below which the mobile adjustments apply.
    pub mobile_breakpoint: u32,
    /// Force speed 0 when the host reports a reduced-motion preference.
    pub respect_reduced_motion: bool,

    // -- Weather -----------------------------------------------------------

    /// Fetch live weather during init.
    pub auto_fetch_weather: bool,
    /// Seconds between weather refreshes. 0 disables periodic refresh.
    pub weather_refresh_interval_secs: u64,
    /// Sunrise used until weather supplies one (minutes of day).
    pub default_sunrise: u32,
    /// Sunset used until weather supplies one (minutes of day).
    pub default_sunset: u32,

    // -- Features ----------------------------------------------------------

    pub enable_particles: bool,
    pub enable_haze: bool,
    /// Push the theme color to the host (mobile browser chrome).
    pub update_theme_color: bool,

    // -- Timing ------------------------------------------------------------

    /// Seconds between solar re-renders.
    pub render_interval_secs: u64,
    /// Milliseconds between the gradient-only pass and renderer construction.
    pub renderer_init_delay_ms: u64,

    /// Fixed seed for the particle RNG. `None` seeds from the OS.
    pub particle_seed: Option<u64>,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            // Portland, OR
            latitude: 45.52,
            longitude: -122.68,
            timezone: "America/Los_Angeles".to_string(),
            utc_offset_minutes: -7 * 60,

            base_speed: 0.4,
            mobile_speed: 0.3,
            mobile_breakpoint: 768,
            respect_reduced_motion: true,

            auto_fetch_weather: true,
            weather_refresh_interval_secs: 0,
            default_sunrise: DEFAULT_SUNRISE,
            default_sunset: DEFAULT_SUNSET,

            enable_particles: true,
            enable_haze: true,
            update_theme_color: false,

            render_interval_secs: 30,
            renderer_init_delay_ms: 80,

            particle_seed: None,
        }
    }
}

impl SkyConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SkyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::debug!("Loaded sky config from {}", path.display());
        Ok(config)
    }

    /// Check ranges that would otherwise produce a nonsensical sky.
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::Configuration(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::Configuration(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        if self.utc_offset().is_none() {
            return Err(Error::Configuration(format!(
                "utc offset {} minutes is out of range",
                self.utc_offset_minutes
            )));
        }
        for (name, v) in [("base_speed", self.base_speed), ("mobile_speed", self.mobile_speed)] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Configuration(format!("{name} must be a non-negative number, got {v}")));
            }
        }
        if self.default_sunrise >= MINUTES_PER_DAY || self.default_sunset >= MINUTES_PER_DAY {
            return Err(Error::Configuration("default sunrise/sunset must be within one day".into()));
        }
        if self.render_interval_secs == 0 {
            return Err(Error::Configuration("render_interval_secs must be positive".into()));
        }
        Ok(())
    }

    /// Configured UTC offset, if representable.
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    #[inline]
    pub fn render_interval(&self) -> Duration {
        Duration::from_secs(self.render_interval_secs)
    }

    #[inline]
    pub fn renderer_init_delay(&self) -> Duration {
        Duration::from_millis(self.renderer_init_delay_ms)
    }

    /// Periodic weather refresh, when enabled.
    pub fn weather_refresh_interval(&self) -> Option<Duration> {
        (self.weather_refresh_interval_secs > 0)
            .then(|| Duration::from_secs(self.weather_refresh_interval_secs))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
