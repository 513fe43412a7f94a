//! The world: the population and the environments it moves through.
//!
//! The `World` owns every [`Person`] and [`Environment`] and mediates the
//! operations that touch both at once — daily registration, contagion
//! propagation, infection application. The simulation driver holds exactly
//! one world and is its only mutator.

pub mod builder;
pub mod environment;
pub mod person;

pub use builder::WorldBuilder;
pub use environment::{Environment, EnvironmentId, EnvironmentKind, PlannedInfection};
pub use person::{
    sample_infectiousness, InfectionData, InfectionSource, Person, PersonId, PersonState,
    RoutineChange,
};

use crate::date::SimDate;
use crate::disease::SeirStage;
use crate::event::Event;
use crate::parameters::DiseaseParams;
use rand::rngs::StdRng;

#[derive(Default)]
pub struct World {
    people: Vec<Person>,
    environments: Vec<Environment>,
}

impl World {
    #[must_use]
    pub fn new() -> World {
        World::default()
    }

    /// Adds an environment and returns its id.
    pub fn add_environment(
        &mut self,
        kind: EnvironmentKind,
        city: &str,
        contact_prob: f64,
    ) -> EnvironmentId {
        let id = EnvironmentId(self.environments.len());
        self.environments
            .push(Environment::new(id, kind, city, contact_prob));
        id
    }

    /// Adds a person who is a member of the given environments and returns
    /// its id. Only valid while generating a population.
    pub fn add_person(
        &mut self,
        age: u32,
        city: &str,
        environments: &[EnvironmentId],
        infectiousness_prob: f64,
    ) -> PersonId {
        let id = PersonId(self.people.len());
        self.people
            .push(Person::new(id, age, city, infectiousness_prob));
        for &env_id in environments {
            self.add_person_to_environment(id, env_id);
        }
        id
    }

    /// Adds an environment membership after the person exists (used for
    /// workplace/school assignment).
    pub fn add_person_to_environment(&mut self, person: PersonId, environment: EnvironmentId) {
        let kind = self.environments[environment.0].kind();
        self.people[person.0].add_environment(environment, kind);
        self.environments[environment.0].add_member(person);
    }

    #[must_use]
    pub fn population_size(&self) -> usize {
        self.people.len()
    }

    #[must_use]
    pub fn all_people(&self) -> &[Person] {
        &self.people
    }

    #[must_use]
    pub fn all_environments(&self) -> &[Environment] {
        &self.environments
    }

    /// # Panics
    ///
    /// Panics if no person has the given id.
    #[must_use]
    pub fn get_person_from_id(&self, id: PersonId) -> &Person {
        &self.people[id.0]
    }

    pub fn person_mut(&mut self, id: PersonId) -> &mut Person {
        &mut self.people[id.0]
    }

    /// All household environments, optionally restricted to one city.
    #[must_use]
    pub fn get_all_city_households(&self) -> Vec<EnvironmentId> {
        self.environments
            .iter()
            .filter(|env| env.kind() == EnvironmentKind::Household)
            .map(Environment::id)
            .collect()
    }

    /// Ids of every person whose changed flag is raised.
    #[must_use]
    pub fn changed_people(&self) -> Vec<PersonId> {
        self.people
            .iter()
            .filter(|person| person.changed())
            .map(Person::get_id)
            .collect()
    }

    /// Signs every person up to every environment they belong to, at their
    /// current routine weights. Idempotent; must run before interventions
    /// generate events, since those may depend on membership.
    pub fn sign_all_people_up_to_environments(&mut self) {
        for id in 0..self.people.len() {
            self.register_person_to_daily_environments(PersonId(id));
        }
    }

    /// Re-registers one person into their daily environments at current
    /// routine weights.
    pub fn register_person_to_daily_environments(&mut self, id: PersonId) {
        let person = &self.people[id.0];
        let sign_ups: Vec<(EnvironmentId, f64)> = person
            .environments()
            .iter()
            .map(|(env_id, _)| (*env_id, person.routine_weight(*env_id)))
            .collect();
        for (env_id, weight) in sign_ups {
            self.environments[env_id.0].sign_up_for_today(id, weight);
        }
    }

    /// Infects a person, attributing the transmission when the source is an
    /// environment, and returns the disease-course events.
    pub fn infect_person(
        &mut self,
        id: PersonId,
        date: SimDate,
        source: InfectionSource,
        seir_times: Option<Vec<SeirStage>>,
        params: &DiseaseParams,
        rng: &mut StdRng,
    ) -> Vec<Event> {
        if let InfectionSource::Environment { transmitter, .. } = source {
            self.people[transmitter.0].record_transmission();
        }
        self.people[id.0].infect_and_get_events(date, source, seir_times, params, rng)
    }

    /// Immunizes a person (no follow-up events).
    pub fn immunize_person(&mut self, id: PersonId, date: SimDate) -> Vec<Event> {
        self.people[id.0].immune_and_get_events(date, InfectionSource::Seed)
    }

    /// Runs contagion through every environment for one day, applying new
    /// infections immediately and returning their disease-course events.
    pub fn propagate_all_environments(
        &mut self,
        date: SimDate,
        params: &DiseaseParams,
        rng: &mut StdRng,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        for index in 0..self.environments.len() {
            let planned =
                self.environments[index].propagate_infection(date, &self.people, params, rng);
            for infection in planned {
                // An attendee of several environments may have been infected
                // by an earlier one on the same day.
                if !self.people[infection.victim.0]
                    .get_disease_state()
                    .is_susceptible()
                {
                    continue;
                }
                let source = InfectionSource::Environment {
                    id: self.environments[index].id(),
                    transmitter: infection.transmitter,
                };
                events.extend(self.infect_person(
                    infection.victim,
                    date,
                    source,
                    None,
                    params,
                    rng,
                ));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::{EnvironmentKind, World};
    use crate::date::SimDate;
    use crate::disease::DiseaseState;
    use crate::parameters::DiseaseParams;
    use crate::world::person::InfectionSource;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn memberships_are_symmetric() {
        let mut world = World::new();
        let household = world.add_environment(EnvironmentKind::Household, "testville", 0.5);
        let person = world.add_person(33, "testville", &[household], 0.4);

        assert_eq!(world.all_environments()[0].members(), &[person]);
        assert_eq!(
            world.get_person_from_id(person).environments(),
            &[(household, EnvironmentKind::Household)]
        );
    }

    #[test]
    fn sign_up_registers_current_weights() {
        let mut world = World::new();
        let household = world.add_environment(EnvironmentKind::Household, "testville", 0.5);
        let person = world.add_person(33, "testville", &[household], 0.4);

        world.sign_all_people_up_to_environments();
        assert_eq!(world.all_environments()[0].attendance_weight(person), 1.0);

        // Re-running keeps the same registration.
        world.sign_all_people_up_to_environments();
        assert_eq!(world.all_environments()[0].attendance_weight(person), 1.0);

        world
            .person_mut(person)
            .add_routine_change("closure", vec![(EnvironmentKind::Household, 0.5)]);
        world.register_person_to_daily_environments(person);
        assert_eq!(world.all_environments()[0].attendance_weight(person), 0.5);
    }

    #[test]
    fn propagation_infects_at_most_once_per_day() {
        // The victim attends two certain-transmission environments; only one
        // infection may be applied.
        let mut world = World::new();
        let household = world.add_environment(EnvironmentKind::Household, "testville", 1000.0);
        let workplace = world.add_environment(EnvironmentKind::Workplace, "testville", 1000.0);
        let source = world.add_person(40, "testville", &[household, workplace], 1.0);
        let victim = world.add_person(41, "testville", &[household, workplace], 1.0);
        world.sign_all_people_up_to_environments();

        let params = DiseaseParams::default();
        let mut rng = seeded_rng();
        world.infect_person(
            source,
            SimDate::new(0),
            InfectionSource::Seed,
            Some(vec![
                (DiseaseState::Latent, Some(1)),
                (DiseaseState::Symptomatic, Some(5)),
                (DiseaseState::Immune, None),
            ]),
            &params,
            &mut rng,
        );
        world.person_mut(source).set_disease_state(DiseaseState::Symptomatic);

        let events = world.propagate_all_environments(SimDate::new(0), &params, &mut rng);
        assert!(world.get_person_from_id(victim).is_infected());
        assert_eq!(world.get_person_from_id(source).num_infections(), 1);
        // One infection produced the victim's course events; the second
        // environment found nobody susceptible.
        assert!(!events.is_empty());
    }

    #[test]
    fn households_listing_excludes_other_kinds() {
        let mut world = World::new();
        let h0 = world.add_environment(EnvironmentKind::Household, "a", 0.5);
        world.add_environment(EnvironmentKind::Workplace, "a", 0.1);
        let h1 = world.add_environment(EnvironmentKind::Household, "b", 0.5);
        assert_eq!(world.get_all_city_households(), vec![h0, h1]);
    }
}
