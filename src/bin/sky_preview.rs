//! Print the sky frame for a location, time and weather as JSON.
//!
//! Usage: cargo run --bin sky_preview -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>      JSON config file (defaults otherwise)
//!   --lat <DEG>          Latitude override
//!   --lon <DEG>          Longitude override
//!   --offset <MIN>       UTC offset in minutes
//!   --at <RFC3339>       Timestamp to render (default: now)
//!   --code <WMO>         Weather code (omit for no weather)
//!   --cover <PCT>        Cloud cover percentage (default: 75)
//!   --phase <PHASE>      Force night | dawn | day | dusk
//!   --angle <DEG>        Force a sun angle
//!   --direction <DIR>    morning | evening, used with --angle (default: morning)
//!   --width <PX>         Viewport width (default: 1280)
//!   --css                Print the CSS surface values instead of the frame

use std::process;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use skyscape::atmosphere::SkyConfig;
use skyscape::core::time::ManualClock;
use skyscape::core::Result;
use skyscape::render::{CssSurface, DeviceProfile, SkyEffect, SkySurface};
use skyscape::{Phase, SunDirection, WeatherOverride};

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .format_timestamp_millis()
    .init();

    if let Err(e) = run() {
        eprintln!("sky_preview: {e}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => SkyConfig::load(path)?,
        None => SkyConfig::default(),
    };
    if let Some(lat) = parse_arg(&args, "--lat") {
        config.latitude = lat;
    }
    if let Some(lon) = parse_arg(&args, "--lon") {
        config.longitude = lon;
    }
    if let Some(offset) = parse_arg(&args, "--offset") {
        config.utc_offset_minutes = offset;
    }
    config.particle_seed = Some(0);

    let at = parse_str_arg(&args, "--at")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let width = parse_arg(&args, "--width").unwrap_or(1280);

    let surface = SharedCss::default();
    let mut sky = SkyEffect::builder(config)
        .surface(surface.clone())
        .clock(ManualClock::new(at))
        .device(DeviceProfile { viewport_width: width, reduced_motion: false })
        .build()?;

    if let Some(code) = parse_arg::<u8>(&args, "--code") {
        let cover = parse_arg(&args, "--cover").unwrap_or(75.0);
        sky.set_weather(WeatherOverride::code(code).with_cloud_cover(cover))?;
    }
    if let Some(phase) = parse_arg::<Phase>(&args, "--phase") {
        sky.set_time_of_day(Some(phase))?;
    }
    if let Some(angle) = parse_arg::<f32>(&args, "--angle") {
        let direction = match parse_str_arg(&args, "--direction").as_deref() {
            Some("evening") => SunDirection::Evening,
            _ => SunDirection::Morning,
        };
        sky.set_sun_angle(Some((angle, direction)))?;
    }
    sky.render_gradient_only()?;

    if args.iter().any(|a| a == "--css") {
        let css = surface.0.borrow();
        println!("background-image: {}", css.background_image);
        println!("background-color: {}", css.background_color);
        if let Some(theme) = &css.theme_color {
            println!("theme-color: {theme}");
        }
        if let Some(haze) = &css.haze_background {
            println!("haze: {haze} (opacity {})", css.haze_opacity);
        }
    } else {
        let frame = sky.compute_frame()?;
        println!("{}", serde_json::to_string_pretty(&frame)?);
    }

    sky.destroy();
    Ok(())
}

/// CSS surface shared with `main` so the values can be printed after the
/// effect has rendered.
#[derive(Clone, Default)]
struct SharedCss(std::rc::Rc<std::cell::RefCell<CssSurface>>);

impl SkySurface for SharedCss {
    fn set_background(&mut self, gradient: &[skyscape::atmosphere::GradientStop], color: skyscape::atmosphere::Rgb) {
        self.0.borrow_mut().set_background(gradient, color);
    }

    fn set_theme_color(&mut self, color: skyscape::atmosphere::Rgb) {
        self.0.borrow_mut().set_theme_color(color);
    }

    fn set_cloud_layer(&mut self, opacity: f32, blur: f32) {
        self.0.borrow_mut().set_cloud_layer(opacity, blur);
    }

    fn set_haze(&mut self, color: skyscape::atmosphere::Rgb, opacity: f32) {
        self.0.borrow_mut().set_haze(color, opacity);
    }
}

fn parse_arg<T: FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
