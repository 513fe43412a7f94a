//! Dated, deferred mutations and the per-day bundles that hold them.
//!
//! An [`Event`] is an atomic unit of deferred work: a date plus a boxed
//! `FnOnce(&mut Simulation)` that mutates the simulation when the calendar
//! reaches that date. A [`DayEvents`] bundle collects every event hooked for
//! one date and applies them in hook order. Applying consumes both the
//! bundle and its events, so nothing can be applied twice.

use crate::date::SimDate;
use crate::simulation::Simulation;

type EventAction = Box<dyn FnOnce(&mut Simulation)>;

/// An atomic, date-stamped unit of deferred work.
///
/// Applying an event mutates exactly the people/environments its action
/// targets. An action may register follow-up events through the simulation's
/// registration choke point, but only on strictly future dates while a
/// bundle is being applied.
pub struct Event {
    date: SimDate,
    action: EventAction,
}

impl Event {
    pub fn new(date: SimDate, action: impl FnOnce(&mut Simulation) + 'static) -> Event {
        Event {
            date,
            action: Box::new(action),
        }
    }

    /// The date this event is scheduled for.
    #[must_use]
    pub fn date(&self) -> SimDate {
        self.date
    }

    pub(crate) fn apply(self, simulation: &mut Simulation) {
        (self.action)(simulation);
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Event").field("date", &self.date).finish()
    }
}

/// The collection of events pending on exactly one date.
///
/// The calendar holds a `DayEvents` for a date if and only if at least one
/// event is scheduled there. The driver removes the bundle from the calendar
/// before applying it, so an event never observes a half-applied sibling via
/// the calendar.
#[derive(Debug)]
pub struct DayEvents {
    date: SimDate,
    hooked: Vec<Event>,
}

impl DayEvents {
    #[must_use]
    pub fn new(date: SimDate) -> DayEvents {
        DayEvents {
            date,
            hooked: Vec::new(),
        }
    }

    #[must_use]
    pub fn date(&self) -> SimDate {
        self.date
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooked.is_empty()
    }

    /// Hook the given event to this bundle. Events fire in hook order.
    pub fn hook(&mut self, event: Event) {
        assert_eq!(
            event.date(),
            self.date,
            "hooked an event dated {} to the bundle for {}",
            event.date(),
            self.date
        );
        self.hooked.push(event);
    }

    /// Apply every hooked event, in the order hooked, to the simulation.
    pub fn apply(self, simulation: &mut Simulation) {
        for event in self.hooked {
            event.apply(simulation);
        }
    }
}
