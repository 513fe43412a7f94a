//! Public-health interventions.
//!
//! An intervention is a policy object that turns into dated events: an
//! activation event that applies a keyed routine change to the affected
//! people, and a deactivation event that releases it. The engine registers
//! the generated events at construction and treats them opaquely from then
//! on.

use crate::date::SimDate;
use crate::event::Event;
use crate::world::{EnvironmentKind, PersonId, RoutineChange, World};
use rand::rngs::StdRng;
use rand::Rng;

/// A policy that, given the world, produces its own dated activation and
/// deactivation events.
pub trait Intervention {
    /// A human-readable description, recorded with the statistics sink for
    /// provenance.
    fn describe(&self) -> String;

    /// Generates the events that create this intervention's behavior. The
    /// world is fully signed up to its environments by the time this runs.
    fn generate_events(&self, world: &World, rng: &mut StdRng) -> Vec<Event>;
}

/// Builds the activate/deactivate event pair for one person.
fn routine_change_events(
    person: PersonId,
    key: &'static str,
    change: RoutineChange,
    start: SimDate,
    end: SimDate,
) -> [Event; 2] {
    let applied = change.clone();
    [
        Event::new(start, move |simulation| {
            simulation
                .world_mut()
                .person_mut(person)
                .add_routine_change(key, applied);
        }),
        Event::new(end, move |simulation| {
            simulation
                .world_mut()
                .person_mut(person)
                .remove_routine_change(key);
        }),
    ]
}

/// Scales down out-of-household contact for a complying share of the whole
/// population.
pub struct SocialDistancingIntervention {
    pub start: SimDate,
    pub duration_days: u32,
    /// Probability that any given person complies.
    pub compliance: f64,
    pub workplace_factor: f64,
    pub community_factor: f64,
}

const SOCIAL_DISTANCING_KEY: &str = "social_distancing";

impl Intervention for SocialDistancingIntervention {
    fn describe(&self) -> String {
        format!(
            "SocialDistancingIntervention(start={}, duration_days={}, compliance={}, \
             workplace_factor={}, community_factor={})",
            self.start, self.duration_days, self.compliance, self.workplace_factor,
            self.community_factor
        )
    }

    fn generate_events(&self, world: &World, rng: &mut StdRng) -> Vec<Event> {
        let change: RoutineChange = vec![
            (EnvironmentKind::Workplace, self.workplace_factor),
            (EnvironmentKind::School, self.workplace_factor),
            (EnvironmentKind::CityCommunity, self.community_factor),
        ];
        let end = self.start + self.duration_days;
        let mut events = Vec::new();
        for person in world.all_people() {
            if rng.random_bool(self.compliance) {
                events.extend(routine_change_events(
                    person.get_id(),
                    SOCIAL_DISTANCING_KEY,
                    change.clone(),
                    self.start,
                    end,
                ));
            }
        }
        events
    }
}

/// Keeps everyone at or above `min_age` out of circulation beyond their
/// household.
pub struct ElderlyQuarantineIntervention {
    pub start: SimDate,
    pub duration_days: u32,
    pub min_age: u32,
}

const ELDERLY_QUARANTINE_KEY: &str = "elderly_quarantine";

impl Intervention for ElderlyQuarantineIntervention {
    fn describe(&self) -> String {
        format!(
            "ElderlyQuarantineIntervention(start={}, duration_days={}, min_age={})",
            self.start, self.duration_days, self.min_age
        )
    }

    fn generate_events(&self, world: &World, _rng: &mut StdRng) -> Vec<Event> {
        let change: RoutineChange = vec![
            (EnvironmentKind::Workplace, 0.0),
            (EnvironmentKind::CityCommunity, 0.05),
        ];
        let end = self.start + self.duration_days;
        let mut events = Vec::new();
        for person in world.all_people() {
            if person.get_age() >= self.min_age {
                events.extend(routine_change_events(
                    person.get_id(),
                    ELDERLY_QUARANTINE_KEY,
                    change.clone(),
                    self.start,
                    end,
                ));
            }
        }
        events
    }
}

/// Closes every workplace for the given period.
pub struct WorkplaceClosureIntervention {
    pub start: SimDate,
    pub duration_days: u32,
}

const WORKPLACE_CLOSURE_KEY: &str = "workplace_closure";

impl Intervention for WorkplaceClosureIntervention {
    fn describe(&self) -> String {
        format!(
            "WorkplaceClosureIntervention(start={}, duration_days={})",
            self.start, self.duration_days
        )
    }

    fn generate_events(&self, world: &World, _rng: &mut StdRng) -> Vec<Event> {
        let change: RoutineChange = vec![(EnvironmentKind::Workplace, 0.0)];
        let end = self.start + self.duration_days;
        let mut events = Vec::new();
        for person in world.all_people() {
            // Only people who actually have a workplace are affected.
            if person
                .environments()
                .iter()
                .any(|(_, kind)| *kind == EnvironmentKind::Workplace)
            {
                events.extend(routine_change_events(
                    person.get_id(),
                    WORKPLACE_CLOSURE_KEY,
                    change.clone(),
                    self.start,
                    end,
                ));
            }
        }
        events
    }
}
