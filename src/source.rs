//! Weather input: snapshots, caller overrides and the Open-Meteo format.
//!
//! The HTTP transport stays with the host. A [`WeatherSource`] hands the
//! driver decoded snapshots; [`decode_open_meteo`] turns a raw Open-Meteo
//! forecast response into one.

use serde::{Deserialize, Serialize};

use crate::atmosphere::config::{SkyConfig, DEFAULT_SUNRISE, DEFAULT_SUNSET};
use crate::core::{Error, Result};

pub const OPEN_METEO_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Latest observed conditions. Replaced wholesale on every update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// WMO weather code.
    pub weather_code: u8,
    /// Cloud cover percentage in `[0, 100]`.
    pub cloud_cover: f32,
    pub is_day: bool,
    /// Air temperature, °C.
    pub temperature: f32,
    /// Local sunrise as minutes of day.
    pub sunrise: Option<u32>,
    /// Local sunset as minutes of day.
    pub sunset: Option<u32>,
}

impl WeatherSnapshot {
    /// Sunrise, or 07:30 when unknown.
    #[inline]
    pub fn sunrise_or_default(&self) -> u32 {
        self.sunrise.unwrap_or(DEFAULT_SUNRISE)
    }

    /// Sunset, or 17:30 when unknown.
    #[inline]
    pub fn sunset_or_default(&self) -> u32 {
        self.sunset.unwrap_or(DEFAULT_SUNSET)
    }
}

/// Caller-supplied weather. Missing fields fall back to a mild overcast day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherOverride {
    pub weather_code: Option<u8>,
    pub cloud_cover: Option<f32>,
    pub is_day: Option<bool>,
    pub temperature: Option<f32>,
    pub sunrise: Option<u32>,
    pub sunset: Option<u32>,
}

impl WeatherOverride {
    pub fn code(weather_code: u8) -> Self {
        Self { weather_code: Some(weather_code), ..Self::default() }
    }

    pub fn with_cloud_cover(mut self, cloud_cover: f32) -> Self {
        self.cloud_cover = Some(cloud_cover);
        self
    }
}

impl From<WeatherOverride> for WeatherSnapshot {
    fn from(o: WeatherOverride) -> Self {
        Self {
            weather_code: o.weather_code.unwrap_or(3),
            cloud_cover: clamp_cover(o.cloud_cover.unwrap_or(75.0)),
            is_day: o.is_day.unwrap_or(true),
            temperature: o.temperature.unwrap_or(15.0),
            sunrise: Some(o.sunrise.unwrap_or(DEFAULT_SUNRISE)),
            sunset: Some(o.sunset.unwrap_or(DEFAULT_SUNSET)),
        }
    }
}

fn clamp_cover(cover: f32) -> f32 {
    if cover.is_nan() { 0.0 } else { cover.clamp(0.0, 100.0) }
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Where to fetch weather for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl WeatherRequest {
    pub fn from_config(config: &SkyConfig) -> Self {
        Self {
            latitude: config.latitude,
            longitude: config.longitude,
            timezone: config.timezone.clone(),
        }
    }

    /// Open-Meteo forecast URL for current conditions plus today's
    /// sunrise and sunset.
    pub fn open_meteo_url(&self) -> String {
        format!(
            "{OPEN_METEO_ENDPOINT}?latitude={}&longitude={}\
             &current=temperature_2m,weather_code,cloud_cover,is_day\
             &daily=sunrise,sunset&timezone={}&forecast_days=1",
            self.latitude,
            self.longitude,
            encode_query_value(&self.timezone),
        )
    }
}

/// Fetches weather snapshots. Implementations own the transport.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    async fn fetch(&self, request: &WeatherRequest) -> Result<WeatherSnapshot>;
}

/// A source that always returns the same snapshot, or always fails when
/// constructed with `None`.
#[derive(Clone, Debug, Default)]
pub struct FixedWeather(pub Option<WeatherSnapshot>);

impl WeatherSource for FixedWeather {
    async fn fetch(&self, _request: &WeatherRequest) -> Result<WeatherSnapshot> {
        self.0
            .clone()
            .ok_or_else(|| Error::WeatherFetch("no weather available".into()))
    }
}

// ---------------------------------------------------------------------------
// Open-Meteo decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: OpenMeteoCurrent,
    #[serde(default)]
    daily: Option<OpenMeteoDaily>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    weather_code: u8,
    cloud_cover: f32,
    is_day: u8,
    temperature_2m: f32,
}

#[derive(Debug, Default, Deserialize)]
struct OpenMeteoDaily {
    #[serde(default)]
    sunrise: Vec<String>,
    #[serde(default)]
    sunset: Vec<String>,
}

/// Decode an Open-Meteo forecast response body.
///
/// Sunrise and sunset come from the first daily entry (`YYYY-MM-DDTHH:MM`,
/// already in the requested zone). Missing or malformed times are `None`.
pub fn decode_open_meteo(body: &str) -> Result<WeatherSnapshot> {
    let response: OpenMeteoResponse = serde_json::from_str(body)
        .map_err(|e| Error::WeatherFetch(format!("malformed weather response: {e}")))?;

    let daily = response.daily.unwrap_or_default();
    let first_time = |values: &[String]| {
        values
            .first()
            .and_then(|s| s.split_once('T'))
            .and_then(|(_, time)| parse_time_to_minutes(time))
    };

    let current = response.current;
    Ok(WeatherSnapshot {
        weather_code: current.weather_code,
        cloud_cover: clamp_cover(current.cloud_cover),
        is_day: current.is_day == 1,
        temperature: current.temperature_2m,
        sunrise: first_time(&daily.sunrise),
        sunset: first_time(&daily.sunset),
    })
}

/// `"HH:MM"` → minutes of day.
pub fn parse_time_to_minutes(time: &str) -> Option<u32> {
    let (h, m) = time.split_once(':')?;
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().get(..2).unwrap_or(m.trim()).parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}

/// Percent-encode everything outside the URL unreserved set.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
