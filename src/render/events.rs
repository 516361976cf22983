//! Notification bus for sky effect lifecycle and render events.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crate::atmosphere::state::FrameState;
use crate::atmosphere::waypoint::Phase;
use crate::source::WeatherSnapshot;

/// Something observable happened.
#[derive(Clone, Debug, PartialEq)]
pub enum SkyEvent {
    /// New weather was applied, fetched or overridden.
    WeatherUpdate(WeatherSnapshot),
    /// A weather fetch failed. The previous snapshot stays in effect.
    WeatherError(String),
    /// The blended phase changed. `previous` is `None` on the first tick.
    TimeChange {
        previous: Option<Phase>,
        current: Phase,
        is_daytime: bool,
    },
    RendererLoading,
    RendererReady,
    /// Emitted after every tick.
    Render {
        frame: FrameState,
        weather: Option<WeatherSnapshot>,
    },
    Destroy,
}

/// Event discriminant used for subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    WeatherUpdate,
    WeatherError,
    TimeChange,
    RendererLoading,
    RendererReady,
    Render,
    Destroy,
}

impl SkyEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SkyEvent::WeatherUpdate(_) => EventKind::WeatherUpdate,
            SkyEvent::WeatherError(_) => EventKind::WeatherError,
            SkyEvent::TimeChange { .. } => EventKind::TimeChange,
            SkyEvent::RendererLoading => EventKind::RendererLoading,
            SkyEvent::RendererReady => EventKind::RendererReady,
            SkyEvent::Render { .. } => EventKind::Render,
            SkyEvent::Destroy => EventKind::Destroy,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&SkyEvent)>;

/// Listeners keyed by event kind, called in subscription order.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&SkyEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(kind).or_default().push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        for list in self.listeners.values_mut() {
            if let Some(pos) = list.iter().position(|(lid, _)| *lid == id) {
                drop(list.remove(pos));
                return true;
            }
        }
        false
    }

    /// Deliver `event` to every listener of its kind. A panicking listener
    /// is logged and skipped; the rest still run.
    pub fn emit(&mut self, event: &SkyEvent) {
        let Some(list) = self.listeners.get_mut(&event.kind()) else {
            return;
        };
        for (id, listener) in list.iter_mut() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
            if result.is_err() {
                log::error!("Listener {:?} panicked handling {:?}", id, event.kind());
            }
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Drop every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
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

    #[test]
    fn test_emit_reaches_matching_listeners() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        bus.on(EventKind::RendererReady, move |e| s.borrow_mut().push(e.kind()));
        let s = seen.clone();
        bus.on(EventKind::RendererReady, move |e| s.borrow_mut().push(e.kind()));

        bus.emit(&SkyEvent::RendererReady);
        bus.emit(&SkyEvent::Destroy);
        assert_eq!(*seen.borrow(), vec![EventKind::RendererReady, EventKind::RendererReady]);
    }

    #[test]
    fn test_off_removes_listener() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let id = bus.on(EventKind::Destroy, move |_| *c.borrow_mut() += 1);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(&SkyEvent::Destroy);
        assert_eq!(*count.borrow(), 0);
        assert_eq!(bus.listener_count(EventKind::Destroy), 0);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        bus.on(EventKind::WeatherError, |_| panic!("listener failure"));
        let c = count.clone();
        bus.on(EventKind::WeatherError, move |_| *c.borrow_mut() += 1);

        bus.emit(&SkyEvent::WeatherError("timeout".into()));
        bus.emit(&SkyEvent::WeatherError("timeout".into()));
        assert_eq!(*count.borrow(), 2, "second listener must still run");
    }

    #[test]
    fn test_clear() {
        let mut bus = EventBus::new();
        bus.on(EventKind::Render, |_| {});
        bus.on(EventKind::Destroy, |_| {});
        bus.clear();
        assert_eq!(bus.listener_count(EventKind::Render), 0);
    }
}
