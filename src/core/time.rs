//! Wall-clock injection and animation frame timing

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Largest step a single animation frame may advance the simulation by.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(50);

/// Source of the current wall-clock time used for live solar tracking.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time, so a
/// test can keep one handle and give the other to the sky effect.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Rc::new(Cell::new(now)) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Tracks animation frame timestamps and hands out clamped deltas.
///
/// The clock must be re-anchored whenever a suspended loop resumes so the
/// first delta is measured from the resume instant.
#[derive(Clone, Debug)]
pub struct FrameClock {
    last_frame: Option<Instant>,
    max_delta: Duration,
    frame_count: u64,
}

impl FrameClock {
    /// Create a frame clock clamping at [`MAX_FRAME_DELTA`]
    pub fn new() -> Self {
        Self::with_max_delta(MAX_FRAME_DELTA)
    }

    pub fn with_max_delta(max_delta: Duration) -> Self {
        Self {
            last_frame: None,
            max_delta,
            frame_count: 0,
        }
    }

    /// Reset the reference point to `now`
    pub fn anchor(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    /// Record a frame at `now` and return the elapsed time since the previous
    /// frame, clamped to the maximum delta.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let delta = match self.last_frame {
            Some(last) => now.saturating_duration_since(last).min(self.max_delta),
            None => Duration::ZERO,
        };
        self.last_frame = Some(now);
        self.frame_count += 1;
        delta
    }

    /// Get total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_first_tick_is_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(Instant::now()), Duration::ZERO);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn test_delta_is_clamped() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.anchor(start);
        let dt = clock.tick(start + Duration::from_secs(3));
        assert_eq!(dt, MAX_FRAME_DELTA);
    }

    #[test]
    fn test_small_delta_passes_through() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.anchor(start);
        let dt = clock.tick(start + Duration::from_millis(16));
        assert_eq!(dt, Duration::from_millis(16));
    }

    #[test]
    fn test_anchor_measures_from_resume() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.anchor(start);
        clock.tick(start + Duration::from_millis(10));
        // Suspended for a long time, then resumed
        let resume = start + Duration::from_secs(60);
        clock.anchor(resume);
        let dt = clock.tick(resume + Duration::from_millis(20));
        assert_eq!(dt, Duration::from_millis(20));
    }

    #[test]
    fn test_manual_clock_shares_time() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 21, 12, 0, 0).unwrap();
        let clock = ManualClock::new(t0);
        let handle = clock.clone();
        handle.advance(chrono::Duration::minutes(30));
        assert_eq!(clock.now(), t0 + chrono::Duration::minutes(30));
    }
}
