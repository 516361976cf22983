//! Sun position calculation.
//!
//! Computes the solar altitude from a timestamp and observer location using
//! the simplified NOAA approximation (truncated Fourier series for the
//! equation of time and declination), and classifies whether the sun is on
//! its morning or evening leg.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Which half of the day the sun is in, relative to solar noon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SunDirection {
    #[default]
    Morning,
    Evening,
}

impl SunDirection {
    /// Morning if `now_minutes` falls before the midpoint of sunrise and
    /// sunset, evening otherwise (solar noon itself counts as evening).
    pub fn classify(now_minutes: u32, sunrise_minutes: u32, sunset_minutes: u32) -> Self {
        let solar_noon = (sunrise_minutes + sunset_minutes) as f32 / 2.0;
        if (now_minutes as f32) < solar_noon {
            SunDirection::Morning
        } else {
            SunDirection::Evening
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SunDirection::Morning => "morning",
            SunDirection::Evening => "evening",
        }
    }
}

/// Solar altitude in degrees above the horizon (negative below).
///
/// The day of year is taken from the timestamp's own calendar date; the
/// hour angle from its UTC time of day.
pub fn solar_altitude<Tz: TimeZone>(latitude: f64, longitude: f64, at: &DateTime<Tz>) -> f32 {
    let day_of_year = at.ordinal() as f64;
    let utc = at.with_timezone(&Utc);
    let hour_utc =
        utc.hour() as f64 + utc.minute() as f64 / 60.0 + utc.second() as f64 / 3600.0;

    // Fractional year (radians)
    let gamma = 2.0 * PI / 365.0 * (day_of_year - 1.0 + (hour_utc - 12.0) / 24.0);

    // Equation of time (minutes)
    let eq_time = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());

    // Declination (radians)
    let decl = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    // True solar time (minutes) -> hour angle
    let true_solar = hour_utc * 60.0 + eq_time + 4.0 * longitude;
    let hour_angle = (true_solar / 4.0 - 180.0).to_radians();

    let lat = latitude.to_radians();
    let sin_alt = lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.cos();
    // Guard floating-point overshoot before the arcsine
    sin_alt.clamp(-1.0, 1.0).asin().to_degrees() as f32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    const PORTLAND: (f64, f64) = (45.52, -122.68);

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_summer_solstice_noon_peak() {
        // Solar noon in Portland is ~20:10 UTC in late June
        let alt = solar_altitude(PORTLAND.0, PORTLAND.1, &utc(2025, 6, 21, 20, 10));
        let expected = 90.0 - 45.52 + 23.44;
        assert!((alt - expected).abs() < 1.0, "alt = {alt}, expected ~{expected}");
    }

    #[test]
    fn test_winter_solstice_noon_is_low() {
        let alt = solar_altitude(PORTLAND.0, PORTLAND.1, &utc(2025, 12, 21, 20, 0));
        assert!((alt - 21.0).abs() < 1.0, "alt = {alt}");
    }

    #[test]
    fn test_local_midnight_below_horizon() {
        let alt = solar_altitude(PORTLAND.0, PORTLAND.1, &utc(2025, 6, 21, 7, 0));
        assert!(alt < -15.0, "midnight alt = {alt}");
    }

    #[test]
    fn test_equator_equinox_near_zenith() {
        let alt = solar_altitude(0.0, 0.0, &utc(2025, 3, 21, 12, 0));
        assert!(alt > 85.0, "alt = {alt}");
    }

    #[test]
    fn test_timezone_does_not_change_instant() {
        let t = utc(2025, 6, 21, 18, 30);
        let pdt = FixedOffset::west_opt(7 * 3600).unwrap();
        let a = solar_altitude(PORTLAND.0, PORTLAND.1, &t);
        let b = solar_altitude(PORTLAND.0, PORTLAND.1, &t.with_timezone(&pdt));
        // Same calendar day in both zones at this instant
        assert!((a - b).abs() < 1e-4);
    }

    #[test]
    fn test_altitude_is_bounded() {
        for h in 0..24 {
            for lat in [-89.9, -45.0, 0.0, 45.0, 89.9] {
                let alt = solar_altitude(lat, 0.0, &utc(2025, 6, 21, h, 0));
                assert!((-90.0..=90.0).contains(&alt), "alt {alt} out of range");
            }
        }
    }

    #[test]
    fn test_direction_classifier() {
        let sunrise = 7 * 60 + 30;
        let sunset = 17 * 60 + 30;
        assert_eq!(SunDirection::classify(8 * 60, sunrise, sunset), SunDirection::Morning);
        assert_eq!(SunDirection::classify(12 * 60 + 29, sunrise, sunset), SunDirection::Morning);
        // Exactly solar noon counts as evening
        assert_eq!(SunDirection::classify(12 * 60 + 30, sunrise, sunset), SunDirection::Evening);
        assert_eq!(SunDirection::classify(23 * 60, sunrise, sunset), SunDirection::Evening);
    }
}
