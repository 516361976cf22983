//! Render orchestration.
//!
//! [`SkyEffect`] merges solar position, overrides and weather into one
//! [`FrameState`] per tick and pushes it to the background surface, the
//! cloud renderer, the haze overlay and the particle field.

pub mod events;
pub mod renderer;
pub mod surface;

pub use events::{EventBus, EventKind, ListenerId, SkyEvent};
pub use renderer::{CloudRenderer, RendererFactory, RendererLoader, RendererSlot, RendererState};
pub use surface::{blur_filter_css, CssSurface, SkySurface};

use std::time::Instant;

use chrono::{FixedOffset, Timelike};

use crate::atmosphere::config::{SkyConfig, DEFAULT_SUNRISE, DEFAULT_SUNSET};
use crate::atmosphere::gradient::weather_theme_color;
use crate::atmosphere::state::{FrameState, SkyState};
use crate::atmosphere::sun::{solar_altitude, SunDirection};
use crate::atmosphere::waypoint::{sample_sky, Phase};
use crate::atmosphere::weather::{particle_spec, weather_modifiers, WeatherModifiers};
use crate::core::time::{Clock, SystemClock};
use crate::core::{Error, Result};
use crate::particles::{ParticleCanvas, ParticleField};
use crate::source::{WeatherOverride, WeatherSnapshot};

/// Blur at or above which the cloud renderer is frozen and hidden.
pub const FREEZE_BLUR: f32 = 10.0;

/// Host display properties that affect rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Viewport width in CSS pixels.
    pub viewport_width: u32,
    /// Host reports a reduced-motion preference.
    pub reduced_motion: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self { viewport_width: 1280, reduced_motion: false }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`SkyEffect`]. A surface is required.
pub struct SkyEffectBuilder {
    config: SkyConfig,
    surface: Option<Box<dyn SkySurface>>,
    canvas: Option<Box<dyn ParticleCanvas>>,
    clock: Box<dyn Clock>,
    device: DeviceProfile,
}

impl SkyEffectBuilder {
    pub fn new(config: SkyConfig) -> Self {
        Self {
            config,
            surface: None,
            canvas: None,
            clock: Box::new(SystemClock),
            device: DeviceProfile::default(),
        }
    }

    pub fn surface(mut self, surface: impl SkySurface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    /// Canvas for rain and snow. Without one, particles never start.
    pub fn canvas(mut self, canvas: impl ParticleCanvas + 'static) -> Self {
        self.canvas = Some(Box::new(canvas));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn device(mut self, device: DeviceProfile) -> Self {
        self.device = device;
        self
    }

    pub fn build(self) -> Result<SkyEffect> {
        self.config.validate()?;
        let surface = self
            .surface
            .ok_or_else(|| Error::Configuration("a sky surface is required".into()))?;
        let offset = self
            .config
            .utc_offset()
            .ok_or_else(|| Error::Configuration("invalid utc offset".into()))?;

        log::info!(
            "Sky effect at ({:.2}, {:.2}), utc offset {} min",
            self.config.latitude,
            self.config.longitude,
            self.config.utc_offset_minutes
        );

        Ok(SkyEffect {
            particles: ParticleField::new(self.config.particle_seed),
            config: self.config,
            offset,
            surface,
            canvas: self.canvas,
            clock: self.clock,
            device: self.device,
            events: EventBus::new(),
            renderer: RendererSlot::new(),
            weather: None,
            phase_override: None,
            angle_override: None,
            phase: None,
            sun_altitude: 0.0,
            sun_direction: SunDirection::Morning,
            current_speed: 0.0,
            paused: false,
            hidden: false,
            particles_were_running: false,
            destroyed: false,
        })
    }
}

// ---------------------------------------------------------------------------
// SkyEffect
// ---------------------------------------------------------------------------

/// Weather-reactive sky. Single-threaded; the host (or
/// [`crate::driver`]) calls into it from its event loop.
pub struct SkyEffect {
    config: SkyConfig,
    offset: FixedOffset,
    surface: Box<dyn SkySurface>,
    canvas: Option<Box<dyn ParticleCanvas>>,
    clock: Box<dyn Clock>,
    device: DeviceProfile,
    events: EventBus,
    renderer: RendererSlot,
    particles: ParticleField,

    weather: Option<WeatherSnapshot>,
    phase_override: Option<Phase>,
    angle_override: Option<(f32, SunDirection)>,

    phase: Option<Phase>,
    sun_altitude: f32,
    sun_direction: SunDirection,
    current_speed: f32,

    paused: bool,
    hidden: bool,
    particles_were_running: bool,
    destroyed: bool,
}

impl SkyEffect {
    pub fn builder(config: SkyConfig) -> SkyEffectBuilder {
        SkyEffectBuilder::new(config)
    }

    #[inline]
    fn ensure_live(&self) -> Result<()> {
        if self.destroyed { Err(Error::Destroyed) } else { Ok(()) }
    }

    // -- Queries -----------------------------------------------------------

    #[inline]
    pub fn config(&self) -> &SkyConfig {
        &self.config
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn weather(&self) -> Option<&WeatherSnapshot> {
        self.weather.as_ref()
    }

    #[inline]
    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    #[inline]
    pub fn renderer(&self) -> &RendererSlot {
        &self.renderer
    }

    /// True when the live solar position drives the sky, so periodic
    /// re-renders are useful.
    pub fn tracks_live_sun(&self) -> bool {
        !self.destroyed && !self.paused && self.phase_override.is_none() && self.angle_override.is_none()
    }

    /// Snapshot of the current visual state.
    pub fn state(&self) -> Result<SkyState> {
        self.ensure_live()?;
        let mods = self.current_modifiers();
        let w = self.weather.as_ref();
        Ok(SkyState {
            phase: self.phase,
            sun_altitude: self.sun_altitude,
            sun_direction: self.sun_direction,
            weather_code: w.map(|w| w.weather_code),
            cloud_cover: w.map(|w| w.cloud_cover),
            temperature: w.map(|w| w.temperature),
            is_daytime: self.phase.is_some_and(Phase::is_daytime),
            paused: self.paused,
            category: mods.map(|m| m.category),
            blur: mods.map_or(0.0, |m| m.blur),
            haze_opacity: mods.map_or(0.0, |m| m.haze_opacity),
            color_convergence: mods.map_or(0.0, |m| m.color_convergence),
        })
    }

    fn current_modifiers(&self) -> Option<WeatherModifiers> {
        self.weather
            .as_ref()
            .map(|w| weather_modifiers(w.weather_code, w.cloud_cover))
    }

    // -- Events ------------------------------------------------------------

    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&SkyEvent) + 'static) -> Result<ListenerId> {
        self.ensure_live()?;
        Ok(self.events.on(kind, listener))
    }

    pub fn off(&mut self, id: ListenerId) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.events.off(id))
    }

    // -- Weather -----------------------------------------------------------

    /// Apply caller-supplied weather; missing fields take defaults.
    pub fn set_weather(&mut self, weather: WeatherOverride) -> Result<()> {
        self.update_weather(WeatherSnapshot::from(weather))
    }

    /// Replace the weather snapshot, re-render and notify.
    pub fn update_weather(&mut self, weather: WeatherSnapshot) -> Result<()> {
        self.ensure_live()?;
        log::debug!("Weather: code {} cover {}%", weather.weather_code, weather.cloud_cover);
        self.weather = Some(weather.clone());
        self.tick(true);
        self.events.emit(&SkyEvent::WeatherUpdate(weather));
        Ok(())
    }

    /// Store a snapshot without rendering or notifying. The next pass picks
    /// it up; start-up uses this before its second gradient pass.
    pub fn record_weather(&mut self, weather: WeatherSnapshot) -> Result<()> {
        self.ensure_live()?;
        log::debug!("Weather recorded: code {} cover {}%", weather.weather_code, weather.cloud_cover);
        self.weather = Some(weather);
        Ok(())
    }

    /// Record a failed fetch. The previous snapshot stays in effect.
    pub fn weather_failed(&mut self, error: &Error) -> Result<()> {
        self.ensure_live()?;
        log::warn!("Weather fetch failed, keeping previous conditions: {error}");
        self.events.emit(&SkyEvent::WeatherError(error.to_string()));
        Ok(())
    }

    // -- Overrides ---------------------------------------------------------

    /// Force a phase, or `None` to return to live tracking. Clears any
    /// angle override.
    pub fn set_time_of_day(&mut self, phase: Option<Phase>) -> Result<()> {
        self.ensure_live()?;
        self.phase_override = phase;
        self.angle_override = None;
        self.tick(true);
        Ok(())
    }

    /// Force a sun angle and direction, or `None` to return to live
    /// tracking. Setting an angle clears any phase override.
    pub fn set_sun_angle(&mut self, angle: Option<(f32, SunDirection)>) -> Result<()> {
        self.ensure_live()?;
        self.angle_override = angle;
        if angle.is_some() {
            self.phase_override = None;
        }
        self.tick(true);
        Ok(())
    }

    // -- Host state --------------------------------------------------------

    /// Update viewport width and particle canvas bounds, then re-render.
    pub fn set_viewport_width(&mut self, width: u32) -> Result<()> {
        self.ensure_live()?;
        self.device.viewport_width = width;
        if let Some(canvas) = &self.canvas {
            self.particles.resize(canvas.size());
        }
        self.tick(true);
        Ok(())
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) -> Result<()> {
        self.ensure_live()?;
        self.device.reduced_motion = reduced;
        self.tick(true);
        Ok(())
    }

    fn reduced_motion(&self) -> bool {
        self.config.respect_reduced_motion && self.device.reduced_motion
    }

    /// Host visibility changed. Hidden suspends animation; visible restores
    /// it unless paused or reduced motion applies.
    pub fn set_visible(&mut self, visible: bool, now: Instant) -> Result<()> {
        self.ensure_live()?;
        if !visible {
            if self.hidden {
                return Ok(());
            }
            self.hidden = true;
            self.renderer.set_speed(0.0);
            if self.particles.is_running() {
                self.particles_were_running = true;
                self.particles.suspend();
            }
            log::debug!("Sky hidden, animation suspended");
            return Ok(());
        }

        if !self.hidden {
            return Ok(());
        }
        self.hidden = false;
        if !self.paused && !self.reduced_motion() {
            self.renderer.set_speed(self.current_speed);
            if self.particles_were_running {
                self.particles.resume(now);
            }
        }
        self.particles_were_running = false;
        Ok(())
    }

    /// Stop animation. Particles are kept for [`resume`](Self::resume).
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.paused {
            return Ok(());
        }
        self.paused = true;
        self.renderer.set_speed(0.0);
        self.particles.suspend();
        log::debug!("Sky paused");
        Ok(())
    }

    pub fn resume(&mut self, now: Instant) -> Result<()> {
        self.ensure_live()?;
        if !self.paused {
            return Ok(());
        }
        self.paused = false;
        self.renderer.set_speed(self.current_speed);
        if !self.hidden {
            self.particles.resume(now);
        }
        log::debug!("Sky resumed");
        self.tick(true);
        Ok(())
    }

    // -- Renderer ----------------------------------------------------------

    /// The renderer dependency is available. Construction happens on the
    /// next full render.
    pub fn attach_renderer(&mut self, factory: Box<dyn RendererFactory>) -> Result<()> {
        self.ensure_live()?;
        self.renderer.attach(factory);
        Ok(())
    }

    /// The renderer dependency failed to load. The sky keeps running with
    /// gradient, haze and particles only.
    pub fn renderer_unavailable(&mut self, error: &Error) -> Result<()> {
        self.ensure_live()?;
        log::warn!("Cloud renderer unavailable, running gradient-only: {error}");
        Ok(())
    }

    /// Construct the renderer with a full render, bracketed by loading and
    /// ready notifications. Returns whether a renderer is now live.
    pub fn start_renderer(&mut self) -> Result<bool> {
        self.ensure_live()?;
        if !self.renderer.has_factory() {
            return Ok(false);
        }
        self.events.emit(&SkyEvent::RendererLoading);
        self.tick(true);
        let ready = self.renderer.is_constructed();
        if ready {
            self.events.emit(&SkyEvent::RendererReady);
        }
        Ok(ready)
    }

    // -- Ticks -------------------------------------------------------------

    /// Full re-render.
    pub fn render(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.tick(true);
        Ok(())
    }

    /// Re-render everything except the cloud renderer.
    pub fn render_gradient_only(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.tick(false);
        Ok(())
    }

    /// Advance and draw particles for one animation frame. Returns whether
    /// anything was drawn.
    pub fn animation_frame(&mut self, now: Instant) -> Result<bool> {
        self.ensure_live()?;
        if self.paused || self.hidden {
            return Ok(false);
        }
        match self.canvas.as_deref_mut() {
            Some(canvas) => Ok(self.particles.frame(now, canvas)),
            None => Ok(false),
        }
    }

    /// Sun angle and direction: angle override, then phase override, then
    /// the live solar position.
    fn resolve_sun(&self) -> (f32, SunDirection) {
        if let Some(forced) = self.angle_override {
            return forced;
        }
        if let Some(phase) = self.phase_override {
            return phase.anchor();
        }

        let local = self.clock.now().with_timezone(&self.offset);
        let altitude = solar_altitude(self.config.latitude, self.config.longitude, &local);
        let now_minutes = local.hour() * 60 + local.minute();
        let (sunrise, sunset) = match &self.weather {
            Some(w) => (w.sunrise_or_default(), w.sunset_or_default()),
            None => (DEFAULT_SUNRISE, DEFAULT_SUNSET),
        };
        (altitude, SunDirection::classify(now_minutes, sunrise, sunset))
    }

    /// Compute the frame for the current inputs without side effects.
    pub fn compute_frame(&self) -> Result<FrameState> {
        self.ensure_live()?;
        Ok(self.frame())
    }

    fn frame(&self) -> FrameState {
        let (angle, direction) = self.resolve_sun();
        let sky = sample_sky(angle, direction);
        let mods = self.current_modifiers();
        let mut frame = FrameState::compose(sky, angle, direction, mods.as_ref());

        let narrow = self.device.viewport_width < self.config.mobile_breakpoint;
        let baseline = if self.reduced_motion() {
            0.0
        } else if narrow {
            self.config.mobile_speed
        } else {
            self.config.base_speed
        };
        frame.constrain(narrow, baseline);
        frame
    }

    fn tick(&mut self, full: bool) {
        let frame = self.frame();
        let previous = self.phase.replace(frame.phase);
        self.sun_altitude = frame.sun_altitude;
        self.sun_direction = frame.sun_direction;
        self.current_speed = frame.speed;

        // Background and theme
        self.surface.set_background(&frame.gradient, frame.theme_color);
        if self.config.update_theme_color {
            let theme = frame
                .category
                .and_then(|c| weather_theme_color(c, frame.phase))
                .unwrap_or(frame.theme_color);
            self.surface.set_theme_color(theme);
        }

        // Clouds
        let freeze = frame.blur >= FREEZE_BLUR;
        if full {
            let mut uniform = frame.uniform();
            if self.paused || self.hidden {
                uniform = uniform.with_speed(0.0);
            }
            self.renderer.update(&uniform, freeze);
            if self.renderer.is_constructed() {
                if self.paused || freeze {
                    self.surface.set_cloud_layer(0.0, 0.0);
                } else {
                    self.surface.set_cloud_layer(frame.cloud_opacity, frame.blur);
                }
            }
        }

        // Haze
        if self.config.enable_haze && frame.haze_opacity > 0.0 {
            self.surface.set_haze(frame.haze_color, frame.haze_opacity);
        } else {
            self.surface.set_haze(frame.haze_color, 0.0);
        }

        if !self.paused {
            self.reconcile_particles(frame.phase);
        }

        if previous != Some(frame.phase) {
            log::debug!("Phase {:?} -> {}", previous, frame.phase);
            self.events.emit(&SkyEvent::TimeChange {
                previous,
                current: frame.phase,
                is_daytime: frame.phase.is_daytime(),
            });
        }
        self.events.emit(&SkyEvent::Render { frame, weather: self.weather.clone() });
    }

    /// Restart particles only when kind or intensity changed.
    fn reconcile_particles(&mut self, phase: Phase) {
        let target = match (&self.weather, self.config.enable_particles) {
            (Some(w), true) => particle_spec(w.weather_code),
            _ => None,
        };
        let Some(spec) = target else {
            self.particles.stop();
            self.particles_were_running = false;
            if let Some(canvas) = self.canvas.as_deref_mut() {
                canvas.clear();
            }
            return;
        };

        if self.particles.spec() == Some(spec) {
            self.particles.set_phase(phase);
            return;
        }
        let Some(canvas) = self.canvas.as_deref() else {
            return;
        };
        self.particles.start(spec, phase, canvas.size(), Instant::now());
        if self.hidden {
            self.particles.suspend();
            self.particles_were_running = true;
        }
    }

    // -- Teardown ----------------------------------------------------------

    /// Stop everything, notify `Destroy` listeners and drop all listeners.
    /// Calling it again does nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.particles.stop();
        if let Some(canvas) = self.canvas.as_deref_mut() {
            canvas.clear();
        }
        self.renderer.destroy();
        self.events.emit(&SkyEvent::Destroy);
        self.events.clear();
        log::info!("Sky effect destroyed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
