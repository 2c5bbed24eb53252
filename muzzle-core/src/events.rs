//! Lifecycle callbacks of a puzzle.
//!
//! Each slot keeps every handler ever registered on it. Dispatch runs the
//! most recently registered handler first and then the older ones, so
//! independent extensions (content sync, scaling, asset notifications) all
//! observe the event without replacing each other.

use std::fmt;
use std::str::FromStr;

use crate::submission::SubmissionPayload;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    Ready,
    Valid,
    Submit,
}

impl FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Event::Ready),
            "valid" => Ok(Event::Valid),
            "submit" => Ok(Event::Submit),
            other => Err(format!("unknown event {other:?}")),
        }
    }
}

type Handler<T> = Box<dyn FnMut(&T)>;

/// Ordered handlers of one event. An empty slot is a no-op.
pub struct EventSlot<T> {
    handlers: Vec<Handler<T>>,
}

impl<T> Default for EventSlot<T> {
    fn default() -> Self {
        EventSlot {
            handlers: Vec::new(),
        }
    }
}

impl<T> EventSlot<T> {
    pub fn register(&mut self, handler: impl FnMut(&T) + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn is_bound(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Runs every handler, newest first. A panicking handler aborts the
    /// handlers registered before it.
    pub fn dispatch(&mut self, arg: &T) {
        for handler in self.handlers.iter_mut().rev() {
            handler(arg);
        }
    }
}

impl<T> fmt::Debug for EventSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSlot")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct EventRegistry {
    ready: EventSlot<()>,
    valid: EventSlot<()>,
    submit: EventSlot<SubmissionPayload>,
    ready_fired: bool,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler that does not need the event argument.
    pub fn register(&mut self, event: Event, mut handler: impl FnMut() + 'static) {
        match event {
            Event::Ready => self.ready.register(move |_| handler()),
            Event::Valid => self.valid.register(move |_| handler()),
            Event::Submit => self.submit.register(move |_| handler()),
        }
    }

    pub fn on_ready(&mut self, handler: impl FnMut() + 'static) {
        self.register(Event::Ready, handler);
    }

    pub fn on_valid(&mut self, handler: impl FnMut() + 'static) {
        self.register(Event::Valid, handler);
    }

    pub fn on_submit(&mut self, handler: impl FnMut(&SubmissionPayload) + 'static) {
        self.submit.register(handler);
    }

    /// Runs `callback` now if the puzzle is already ready, otherwise once it
    /// becomes ready.
    pub fn run(&mut self, mut callback: impl FnMut() + 'static) {
        if self.ready_fired {
            callback();
        } else {
            self.on_ready(callback);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready_fired
    }

    pub fn is_bound(&self, event: Event) -> bool {
        match event {
            Event::Ready => self.ready.is_bound(),
            Event::Valid => self.valid.is_bound(),
            Event::Submit => self.submit.is_bound(),
        }
    }

    pub fn fire_ready(&mut self) {
        self.ready_fired = true;
        self.ready.dispatch(&());
    }

    pub fn fire_valid(&mut self) {
        self.valid.dispatch(&());
    }

    pub fn fire_submit(&mut self, payload: &SubmissionPayload) {
        self.submit.dispatch(payload);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnMut()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &'static str| -> Box<dyn FnMut()> {
            let sink = sink.clone();
            Box::new(move || sink.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn handlers_compose_newest_first() {
        let (log, make) = recorder();
        let mut events = EventRegistry::new();
        events.on_valid(make("first"));
        events.on_valid(make("second"));
        events.fire_valid();
        assert_eq!(*log.borrow(), vec!["second", "first"]);
    }

    #[test]
    fn unbound_slots_are_noops() {
        let mut events = EventRegistry::new();
        assert!(!events.is_bound(Event::Submit));
        events.fire_valid();
        events.fire_ready();
        assert!(events.is_ready());
    }

    #[test]
    fn run_waits_for_ready_then_runs_immediately() {
        let (log, make) = recorder();
        let mut events = EventRegistry::new();
        events.run(make("early"));
        assert!(log.borrow().is_empty());
        events.fire_ready();
        assert_eq!(*log.borrow(), vec!["early"]);
        events.run(make("late"));
        assert_eq!(*log.borrow(), vec!["early", "late"]);
    }

    #[test]
    fn a_panicking_handler_skips_older_ones() {
        let (log, make) = recorder();
        let mut events = EventRegistry::new();
        events.on_ready(make("older"));
        events.on_ready(|| panic!("handler failed"));
        let fire = std::panic::AssertUnwindSafe(|| events.fire_ready());
        assert!(std::panic::catch_unwind(fire).is_err());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn event_names_parse() {
        assert_eq!("submit".parse::<Event>(), Ok(Event::Submit));
        assert!("load".parse::<Event>().is_err());
    }
}
