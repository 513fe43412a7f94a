//! A person in the simulated population.
//!
//! A person carries a disease state, a record of how they were infected, and
//! a daily routine: a weight for every environment they belong to, modified
//! multiplicatively by keyed routine changes (interventions). The engine
//! only re-examines people whose `changed` flag is set, so every mutation
//! here is responsible for raising it.

use crate::date::SimDate;
use crate::disease::{sample_seir_times, DiseaseState, SeirStage};
use crate::event::Event;
use crate::parameters::{DiseaseParams, PersonParams};
use crate::world::environment::{EnvironmentId, EnvironmentKind};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Gamma};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A unique identifier for a person in the population.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct PersonId(pub usize);

impl Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "person {}", self.0)
    }
}

/// Where an infection came from.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InfectionSource {
    /// Seeded directly by one of the initial-infection protocols.
    Seed,
    Environment {
        id: EnvironmentId,
        transmitter: PersonId,
    },
}

/// Who/when/where a person was infected. The date is cleared for seed
/// infections injected before the simulation's start so they stay out of
/// the reproduction-number window.
#[derive(Copy, Clone, Debug)]
pub struct InfectionData {
    pub date: Option<SimDate>,
    pub source: InfectionSource,
}

/// The part of a person's state the statistics sink compares day over day.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PersonState {
    pub age: u32,
    pub disease_state: DiseaseState,
}

/// A multiplicative routine adjustment: a weight factor per environment
/// kind. Factors for kinds a person has no environment of are ignored.
pub type RoutineChange = Vec<(EnvironmentKind, f64)>;

pub struct Person {
    id: PersonId,
    age: u32,
    city: String,
    disease_state: DiseaseState,
    /// Per-contact transmission probability, sampled once per person.
    infectiousness_prob: f64,
    infection_data: Option<InfectionData>,
    /// How many people this person has infected, for R statistics.
    num_infections: u32,
    changed: bool,
    last_state: Option<PersonState>,
    environments: Vec<(EnvironmentId, EnvironmentKind)>,
    current_routine: FxHashMap<EnvironmentId, f64>,
    // A routine change may be forced by several interventions at once; it is
    // only lifted when the last of them releases it.
    routine_changes: FxHashMap<&'static str, RoutineChange>,
    routine_change_multiplicities: FxHashMap<&'static str, u32>,
}

/// Draws a person's per-contact transmission probability: a population
/// baseline scaled by an individual Gamma draw, capped at 1.
pub fn sample_infectiousness(params: &PersonParams, rng: &mut StdRng) -> f64 {
    let gamma = Gamma::new(
        params.individual_infectiousness_gamma_shape,
        params.individual_infectiousness_gamma_scale,
    )
    .unwrap();
    (params.base_infectiousness * gamma.sample(rng)).min(1.0)
}

impl Person {
    pub(crate) fn new(id: PersonId, age: u32, city: &str, infectiousness_prob: f64) -> Person {
        Person {
            id,
            age,
            city: city.to_string(),
            disease_state: DiseaseState::Susceptible,
            infectiousness_prob,
            infection_data: None,
            num_infections: 0,
            changed: true,
            last_state: None,
            environments: Vec::new(),
            current_routine: FxHashMap::default(),
            routine_changes: FxHashMap::default(),
            routine_change_multiplicities: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn get_id(&self) -> PersonId {
        self.id
    }

    #[must_use]
    pub fn get_age(&self) -> u32 {
        self.age
    }

    #[must_use]
    pub fn get_city_name(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub fn get_disease_state(&self) -> DiseaseState {
        self.disease_state
    }

    #[must_use]
    pub fn is_infected(&self) -> bool {
        self.disease_state.is_infected()
    }

    #[must_use]
    pub fn is_infectious(&self) -> bool {
        self.disease_state.is_infectious()
    }

    #[must_use]
    pub fn get_infection_data(&self) -> Option<&InfectionData> {
        self.infection_data.as_ref()
    }

    pub(crate) fn infection_data_mut(&mut self) -> Option<&mut InfectionData> {
        self.infection_data.as_mut()
    }

    #[must_use]
    pub fn num_infections(&self) -> u32 {
        self.num_infections
    }

    pub(crate) fn record_transmission(&mut self) {
        self.num_infections += 1;
    }

    /// The per-contact transmission probability in the current disease
    /// state.
    #[must_use]
    pub fn prob_to_infect_on_contact(&self, params: &DiseaseParams) -> f64 {
        self.infectiousness_prob * self.disease_state.infectiousness_factor(params)
    }

    /// Whether this person changed since the last `save_state`.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// The state recorded at the last `save_state`, if any.
    #[must_use]
    pub fn last_state(&self) -> Option<PersonState> {
        self.last_state
    }

    /// The state the statistics sink snapshots.
    #[must_use]
    pub fn get_state(&self) -> PersonState {
        PersonState {
            age: self.age,
            disease_state: self.disease_state,
        }
    }

    /// After a changed person has been recorded, the driver saves its state
    /// as the baseline for the next day and lowers the changed flag.
    pub fn save_state(&mut self) {
        self.last_state = Some(self.get_state());
        self.changed = false;
    }

    pub(crate) fn environments(&self) -> &[(EnvironmentId, EnvironmentKind)] {
        &self.environments
    }

    /// The person's current weight for the given environment.
    #[must_use]
    pub fn routine_weight(&self, environment: EnvironmentId) -> f64 {
        self.current_routine.get(&environment).copied().unwrap_or(0.0)
    }

    /// Adds an environment membership with a default weight of 1. Only
    /// valid while generating a population, not mid-simulation.
    pub(crate) fn add_environment(&mut self, id: EnvironmentId, kind: EnvironmentKind) {
        assert!(
            !self.current_routine.contains_key(&id),
            "{} already belongs to environment {id:?}",
            self.id
        );
        self.environments.push((id, kind));
        self.current_routine.insert(id, 1.0);
        self.changed = true;
    }

    pub fn set_disease_state(&mut self, new_state: DiseaseState) {
        self.disease_state = new_state;
        self.changed = true;
    }

    /// Applies a keyed routine change. Applying the same key again only
    /// bumps its multiplicity; the stored change must be identical.
    pub fn add_routine_change(&mut self, key: &'static str, change: RoutineChange) {
        if let Some(existing) = self.routine_changes.get(key) {
            assert_eq!(
                *existing, change,
                "routine change '{key}' re-applied with a different value"
            );
            *self.routine_change_multiplicities.get_mut(key).unwrap() += 1;
        } else {
            self.routine_changes.insert(key, change);
            self.routine_change_multiplicities.insert(key, 1);
            self.update_routine();
        }
    }

    /// Releases one application of a keyed routine change; the change is
    /// lifted only when its multiplicity returns to zero.
    pub fn remove_routine_change(&mut self, key: &str) {
        let multiplicity = self
            .routine_change_multiplicities
            .get_mut(key)
            .unwrap_or_else(|| panic!("routine change '{key}' is not applied to {}", self.id));
        *multiplicity -= 1;
        if *multiplicity == 0 {
            self.routine_changes.remove(key);
            self.routine_change_multiplicities.remove(key);
            self.update_routine();
        }
    }

    /// Recomputes the current routine as the product of all active changes.
    fn update_routine(&mut self) {
        let mut new_routine: FxHashMap<EnvironmentId, f64> = self
            .environments
            .iter()
            .map(|(id, _)| (*id, 1.0))
            .collect();
        for change in self.routine_changes.values() {
            for (env_id, kind) in &self.environments {
                for (changed_kind, factor) in change {
                    if kind == changed_kind {
                        *new_routine.get_mut(env_id).unwrap() *= factor;
                    }
                }
            }
        }
        self.current_routine = new_routine;
        self.changed = true;
    }

    /// Infects this person: transitions to `Latent` immediately, records the
    /// infection data, and returns the dated events of the rest of the
    /// disease course. The course is sampled unless `seir_times` supplies an
    /// explicit one.
    ///
    /// # Panics
    ///
    /// Panics if the person is not susceptible or already carries infection
    /// data.
    pub fn infect_and_get_events(
        &mut self,
        date: SimDate,
        source: InfectionSource,
        seir_times: Option<Vec<SeirStage>>,
        params: &DiseaseParams,
        rng: &mut StdRng,
    ) -> Vec<Event> {
        assert!(
            self.disease_state.is_susceptible(),
            "infecting {} in state {}",
            self.id,
            self.disease_state
        );
        assert!(
            self.infection_data.is_none(),
            "infecting {} who is already infected",
            self.id
        );
        self.set_disease_state(DiseaseState::Latent);
        self.infection_data = Some(InfectionData {
            date: Some(date),
            source,
        });
        let stages = seir_times.unwrap_or_else(|| sample_seir_times(params, rng));
        self.events_from_seir_times(date, &stages)
    }

    /// Immunizes this person immediately. Immunity generates no further
    /// events.
    ///
    /// # Panics
    ///
    /// Panics unless the person is susceptible or latent.
    pub fn immune_and_get_events(&mut self, _date: SimDate, _source: InfectionSource) -> Vec<Event> {
        assert!(
            matches!(
                self.disease_state,
                DiseaseState::Susceptible | DiseaseState::Latent
            ),
            "immunizing {} in state {}",
            self.id,
            self.disease_state
        );
        self.set_disease_state(DiseaseState::Immune);
        Vec::new()
    }

    /// Turns a sampled disease course into dated state-change events. The
    /// first stage is the state entered at infection; each later stage
    /// begins when the previous stage's duration elapses.
    fn events_from_seir_times(&self, date: SimDate, stages: &[SeirStage]) -> Vec<Event> {
        assert!(
            stages.last().unwrap().1.is_none(),
            "disease course must end in a terminal stage"
        );
        let id = self.id;
        let mut events = Vec::with_capacity(stages.len() - 1);
        let mut current_date = date;
        for i in 1..stages.len() {
            current_date += stages[i - 1].1.unwrap();
            let new_state = stages[i].0;
            events.push(Event::new(current_date, move |simulation| {
                simulation
                    .world_mut()
                    .person_mut(id)
                    .set_disease_state(new_state);
            }));
        }
        events
    }
}

impl fmt::Debug for Person {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Person")
            .field("id", &self.id)
            .field("age", &self.age)
            .field("state", &self.disease_state)
            .field("changed", &self.changed)
            .finish()
    }
}
