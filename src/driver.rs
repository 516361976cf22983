//! Async driver for a [`SkyEffect`].
//!
//! Runs on a current-thread tokio runtime and multiplexes the periodic solar
//! re-render, the optional weather refresh, animation frames and host
//! commands. The sky effect itself stays synchronous.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::atmosphere::config::SkyConfig;
use crate::atmosphere::sun::SunDirection;
use crate::atmosphere::waypoint::Phase;
use crate::core::{Error, Result};
use crate::render::{RendererLoader, SkyEffect};
use crate::source::{WeatherOverride, WeatherRequest, WeatherSnapshot, WeatherSource};

/// Animation frame period (~60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

const COMMAND_BUFFER: usize = 32;

/// A weather fetch polled alongside the driver's other work.
type PendingFetch<'a> = Pin<Box<dyn Future<Output = Result<WeatherSnapshot>> + 'a>>;

/// Host requests forwarded to the sky effect.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetWeather(WeatherOverride),
    SetTimeOfDay(Option<Phase>),
    SetSunAngle(Option<(f32, SunDirection)>),
    SetVisible(bool),
    SetViewportWidth(u32),
    SetReducedMotion(bool),
    Pause,
    Resume,
    /// Start a weather fetch. Ignored while one is already in flight.
    RefreshWeather,
    Destroy,
}

/// Sending side of the driver's command channel.
#[derive(Clone, Debug)]
pub struct DriverHandle {
    tx: mpsc::Sender<Command>,
}

impl DriverHandle {
    /// Queue a command. Fails with [`Error::Destroyed`] once the driver has
    /// stopped.
    pub async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| Error::Destroyed)
    }
}

pub struct SkyDriver<S, L> {
    effect: SkyEffect,
    source: S,
    loader: L,
    commands: mpsc::Receiver<Command>,
}

impl<S: WeatherSource, L: RendererLoader> SkyDriver<S, L> {
    pub fn new(effect: SkyEffect, source: S, loader: L) -> (Self, DriverHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let driver = Self { effect, source, loader, commands };
        (driver, DriverHandle { tx })
    }

    #[inline]
    pub fn effect(&self) -> &SkyEffect {
        &self.effect
    }

    /// Staged start-up: gradient first, then weather and the renderer
    /// dependency in parallel, then a second gradient pass with the weather,
    /// then the renderer after a short delay.
    pub async fn init(&mut self) -> Result<()> {
        self.effect.render_gradient_only()?;

        let request = WeatherRequest::from_config(self.effect.config());
        let auto_fetch = self.effect.config().auto_fetch_weather;
        let source = &self.source;
        let loader = &self.loader;
        let fetch = async {
            if auto_fetch { Some(source.fetch(&request).await) } else { None }
        };
        let (weather, renderer) = tokio::join!(fetch, loader.load());

        match weather {
            Some(Ok(snapshot)) => self.effect.record_weather(snapshot)?,
            Some(Err(e)) => self.effect.weather_failed(&e)?,
            None => {}
        }
        match renderer {
            Ok(factory) => self.effect.attach_renderer(factory)?,
            Err(e) => self.effect.renderer_unavailable(&e)?,
        }
        self.effect.render_gradient_only()?;

        if self.effect.renderer().has_factory() {
            time::sleep(self.effect.config().renderer_init_delay()).await;
            self.effect.start_renderer()?;
        }
        Ok(())
    }

    /// Initialise, then run until a `Destroy` command arrives or every
    /// handle is dropped. The effect is destroyed on exit, abandoning any
    /// fetch still in flight.
    pub async fn run(mut self) -> Result<()> {
        self.init().await?;
        let Self { mut effect, source, commands: mut rx, .. } = self;

        let render_period = effect.config().render_interval();
        let mut render_tick = time::interval_at(time::Instant::now() + render_period, render_period);
        render_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut frame_tick = time::interval(FRAME_INTERVAL);
        frame_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut weather_tick = effect.config().weather_refresh_interval().map(|period| {
            let mut iv = time::interval_at(time::Instant::now() + period, period);
            iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
            iv
        });

        let mut pending: Option<PendingFetch<'_>> = None;

        loop {
            tokio::select! {
                _ = render_tick.tick() => {
                    if effect.tracks_live_sun() {
                        effect.render()?;
                    }
                }
                _ = frame_tick.tick() => {
                    effect.animation_frame(std::time::Instant::now())?;
                }
                _ = next_tick(&mut weather_tick) => {
                    begin_fetch(&mut pending, &source, effect.config());
                }
                result = next_fetch(&mut pending) => {
                    pending = None;
                    match result {
                        Ok(snapshot) => effect.update_weather(snapshot)?,
                        Err(e) => effect.weather_failed(&e)?,
                    }
                }
                command = rx.recv() => {
                    let Some(command) = command else { break };
                    if !apply(&mut effect, &mut pending, &source, command)? {
                        break;
                    }
                }
            }
        }

        drop(pending);
        effect.destroy();
        Ok(())
    }
}

/// Apply one host command. Returns `false` when the driver should stop.
fn apply<'a, S: WeatherSource>(
    effect: &mut SkyEffect,
    pending: &mut Option<PendingFetch<'a>>,
    source: &'a S,
    command: Command,
) -> Result<bool> {
    let now = std::time::Instant::now();
    match command {
        Command::SetWeather(weather) => effect.set_weather(weather)?,
        Command::SetTimeOfDay(phase) => effect.set_time_of_day(phase)?,
        Command::SetSunAngle(angle) => effect.set_sun_angle(angle)?,
        Command::SetVisible(visible) => effect.set_visible(visible, now)?,
        Command::SetViewportWidth(width) => effect.set_viewport_width(width)?,
        Command::SetReducedMotion(reduced) => effect.set_reduced_motion(reduced)?,
        Command::Pause => effect.pause()?,
        Command::Resume => effect.resume(now)?,
        Command::RefreshWeather => begin_fetch(pending, source, effect.config()),
        Command::Destroy => return Ok(false),
    }
    Ok(true)
}

/// Start a fetch unless one is already in flight.
fn begin_fetch<'a, S: WeatherSource>(pending: &mut Option<PendingFetch<'a>>, source: &'a S, config: &SkyConfig) {
    if pending.is_some() {
        log::debug!("Weather fetch already in flight");
        return;
    }
    let request = WeatherRequest::from_config(config);
    *pending = Some(Box::pin(async move { source.fetch(&request).await }));
}

/// Resolve the in-flight fetch; never completes when there is none.
async fn next_fetch(pending: &mut Option<PendingFetch<'_>>) -> Result<WeatherSnapshot> {
    match pending {
        Some(fetch) => fetch.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Tick an optional interval; never completes when absent.
async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::{TimeZone, Utc};

    use crate::atmosphere::state::CloudUniform;
    use crate::core::time::ManualClock;
    use crate::render::{CloudRenderer, CssSurface, EventKind, RendererFactory, SkyEvent};
    use crate::source::FixedWeather;

    struct NullRenderer;

    impl CloudRenderer for NullRenderer {
        fn set_options(&mut self, _options: &CloudUniform) {}
        fn set_speed(&mut self, _speed: f32) {}
        fn suspend(&mut self) {}
        fn destroy(&mut self) {}
    }

    struct NullFactory;

    impl RendererFactory for NullFactory {
        fn construct(&mut self, _options: &CloudUniform) -> Result<Box<dyn CloudRenderer>> {
            Ok(Box::new(NullRenderer))
        }
    }

    struct Loader(bool);

    impl RendererLoader for Loader {
        async fn load(&self) -> Result<Box<dyn RendererFactory>> {
            if self.0 {
                Ok(Box::new(NullFactory))
            } else {
                Err(Error::DependencyLoad("script blocked".into()))
            }
        }
    }

    fn rain() -> WeatherSnapshot {
        WeatherSnapshot {
            weather_code: 63,
            cloud_cover: 90.0,
            is_day: true,
            temperature: 11.0,
            sunrise: Some(330),
            sunset: Some(1260),
        }
    }

    /// Weather source that answers after a fixed delay.
    struct SlowWeather {
        delay: Duration,
        snapshot: WeatherSnapshot,
    }

    impl WeatherSource for SlowWeather {
        async fn fetch(&self, _request: &WeatherRequest) -> Result<WeatherSnapshot> {
            time::sleep(self.delay).await;
            Ok(self.snapshot.clone())
        }
    }

    type Timeline = Rc<RefCell<Vec<(time::Instant, SkyEvent)>>>;

    fn noon_effect(config: SkyConfig) -> SkyEffect {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 21, 19, 0, 0).unwrap());
        SkyEffect::builder(config)
            .surface(CssSurface::default())
            .clock(clock)
            .build()
            .unwrap()
    }

    fn recorded_effect() -> (SkyEffect, Rc<RefCell<Vec<EventKind>>>) {
        let mut effect = noon_effect(SkyConfig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::WeatherUpdate,
            EventKind::WeatherError,
            EventKind::RendererLoading,
            EventKind::RendererReady,
            EventKind::Destroy,
        ] {
            let s = seen.clone();
            effect.on(kind, move |e| s.borrow_mut().push(e.kind())).unwrap();
        }
        (effect, seen)
    }

    /// Effect without start-up fetch whose weather, phase and render events
    /// are stamped with the (paused) tokio clock.
    fn timed_effect(config: SkyConfig) -> (SkyEffect, Timeline) {
        let mut effect = noon_effect(SkyConfig { auto_fetch_weather: false, ..config });
        let timeline: Timeline = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::WeatherUpdate,
            EventKind::WeatherError,
            EventKind::TimeChange,
            EventKind::Render,
        ] {
            let t = timeline.clone();
            effect
                .on(kind, move |e| t.borrow_mut().push((time::Instant::now(), e.clone())))
                .unwrap();
        }
        (effect, timeline)
    }

    fn count(timeline: &Timeline, kind: EventKind) -> usize {
        timeline.borrow().iter().filter(|(_, e)| e.kind() == kind).count()
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_init_sequence() {
        let (effect, seen) = recorded_effect();
        let (mut driver, _handle) = SkyDriver::new(effect, FixedWeather(Some(rain())), Loader(true));
        driver.init().await.unwrap();

        // Start-up weather is recorded for the gradient pass, not announced
        assert_eq!(*seen.borrow(), vec![EventKind::RendererLoading, EventKind::RendererReady]);
        assert!(driver.effect().renderer().is_constructed());
        assert_eq!(driver.effect().weather().map(|w| w.weather_code), Some(63));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_init_degrades_gracefully() {
        let (effect, seen) = recorded_effect();
        let (mut driver, _handle) = SkyDriver::new(effect, FixedWeather(None), Loader(false));
        driver.init().await.unwrap();

        assert_eq!(*seen.borrow(), vec![EventKind::WeatherError]);
        assert!(!driver.effect().renderer().is_constructed());
        assert!(driver.effect().weather().is_none());
        assert!(driver.effect().state().unwrap().phase.is_some());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_run_until_destroy() {
        let (effect, seen) = recorded_effect();
        let (driver, handle) = SkyDriver::new(effect, FixedWeather(Some(rain())), Loader(true));

        let commands = async {
            handle.send(Command::SetTimeOfDay(Some(Phase::Night))).await.unwrap();
            handle.send(Command::Pause).await.unwrap();
            time::sleep(Duration::from_secs(45)).await;
            handle.send(Command::Resume).await.unwrap();
            handle.send(Command::Destroy).await.unwrap();
        };
        let (result, ()) = tokio::join!(driver.run(), commands);
        result.unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![EventKind::RendererLoading, EventKind::RendererReady, EventKind::Destroy]
        );
        assert!(handle.send(Command::Pause).await.is_err());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_commands_apply_while_fetch_in_flight() {
        let (effect, timeline) = timed_effect(SkyConfig::default());
        let source = SlowWeather { delay: Duration::from_secs(10), snapshot: rain() };
        let (driver, handle) = SkyDriver::new(effect, source, Loader(false));
        let started = time::Instant::now();

        let commands = async {
            handle.send(Command::RefreshWeather).await.unwrap();
            handle.send(Command::SetTimeOfDay(Some(Phase::Night))).await.unwrap();
            time::sleep(Duration::from_secs(1)).await;

            let night_at = timeline.borrow().iter().find_map(|(at, e)| match e {
                SkyEvent::TimeChange { current: Phase::Night, .. } => Some(*at),
                _ => None,
            });
            let night_at = night_at.expect("night override not applied during fetch");
            assert!(night_at - started < Duration::from_secs(1), "override waited {:?}", night_at - started);
            assert_eq!(count(&timeline, EventKind::WeatherUpdate), 0);

            time::sleep(Duration::from_secs(10)).await;
            assert_eq!(count(&timeline, EventKind::WeatherUpdate), 1);
            handle.send(Command::Destroy).await.unwrap();
        };
        let (result, ()) = tokio::join!(driver.run(), commands);
        result.unwrap();
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_destroy_does_not_wait_for_fetch() {
        let (effect, _timeline) = timed_effect(SkyConfig::default());
        let source = SlowWeather { delay: Duration::from_secs(3600), snapshot: rain() };
        let (driver, handle) = SkyDriver::new(effect, source, Loader(false));
        let started = time::Instant::now();

        let commands = async {
            handle.send(Command::RefreshWeather).await.unwrap();
            handle.send(Command::Destroy).await.unwrap();
        };
        let (result, ()) = tokio::join!(driver.run(), commands);
        result.unwrap();
        assert!(time::Instant::now() - started < Duration::from_secs(1));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_periodic_refresh() {
        let config = SkyConfig { weather_refresh_interval_secs: 60, ..SkyConfig::default() };
        let (effect, timeline) = timed_effect(config);
        let (driver, handle) = SkyDriver::new(effect, FixedWeather(Some(rain())), Loader(false));

        let commands = async {
            time::sleep(Duration::from_secs(59)).await;
            assert_eq!(count(&timeline, EventKind::WeatherUpdate), 0);
            time::sleep(Duration::from_secs(2)).await;
            assert_eq!(count(&timeline, EventKind::WeatherUpdate), 1);
            time::sleep(Duration::from_secs(60)).await;
            assert_eq!(count(&timeline, EventKind::WeatherUpdate), 2);
            handle.send(Command::Destroy).await.unwrap();
        };
        let (result, ()) = tokio::join!(driver.run(), commands);
        result.unwrap();
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_failed_refresh_keeps_weather() {
        let (effect, timeline) = timed_effect(SkyConfig::default());
        let (driver, handle) = SkyDriver::new(effect, FixedWeather(None), Loader(false));

        let commands = async {
            handle.send(Command::SetWeather(WeatherOverride::code(2))).await.unwrap();
            handle.send(Command::RefreshWeather).await.unwrap();
            time::sleep(Duration::from_millis(100)).await;
            assert_eq!(count(&timeline, EventKind::WeatherError), 1);

            // A full pass after the failure still carries the override
            handle.send(Command::SetTimeOfDay(Some(Phase::Dusk))).await.unwrap();
            time::sleep(Duration::from_millis(100)).await;
            let last_weather = timeline.borrow().iter().rev().find_map(|(_, e)| match e {
                SkyEvent::Render { weather, .. } => Some(weather.as_ref().map(|w| w.weather_code)),
                _ => None,
            });
            assert_eq!(last_weather, Some(Some(2)));
            handle.send(Command::Destroy).await.unwrap();
        };
        let (result, ()) = tokio::join!(driver.run(), commands);
        result.unwrap();
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_dropping_handle_stops_driver() {
        let (effect, seen) = recorded_effect();
        let (driver, handle) = SkyDriver::new(effect, FixedWeather(None), Loader(false));
        drop(handle);
        driver.run().await.unwrap();
        assert_eq!(seen.borrow().last(), Some(&EventKind::Destroy));
    }
}
