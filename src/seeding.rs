//! Initial-infection protocols.
//!
//! Before day-stepping begins, exactly one of three mutually exclusive
//! protocols chooses the initial infected (and immune) individuals: a
//! uniform random draw over the population, a household-level draw, or an
//! explicit chosen set (which may be dated before the simulation starts).
//! Each protocol is guarded: a second seeding call on the same simulation
//! fails.

use crate::date::SimDate;
use crate::disease::SeirStage;
use crate::error::EpidayError;
use crate::simulation::Simulation;
use crate::world::{InfectionSource, PersonId};
use rand::seq::{index, SliceRandom};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// One explicitly chosen seed infection: who, when (possibly before the
/// simulation's current date), and optionally the exact disease course.
#[derive(Clone, Debug)]
pub struct ChosenInfection {
    pub person: PersonId,
    pub date: SimDate,
    pub seir_times: Option<Vec<SeirStage>>,
}

impl Simulation {
    /// Infects a uniformly random initial set, so that the disease can
    /// spread during the simulation. First immunizes
    /// `round(per_to_immune × population)` individuals of age at least
    /// `min_age`, then infects `num_infected` of the remaining susceptible
    /// individuals. `city_name` restricts the draw to one city.
    ///
    /// # Errors
    ///
    /// Fails if seeding already ran, if the population is smaller than
    /// `num_infected + num_immune`, or if the eligible/susceptible pools
    /// cannot satisfy the request.
    pub fn infect_random_set(
        &mut self,
        num_infected: usize,
        infection_doc: &str,
        per_to_immune: f64,
        city_name: Option<&str>,
        min_age: u32,
    ) -> Result<(), EpidayError> {
        self.initial_infection_doc
            .configure(infection_doc.to_string(), "initial infection seeding")?;

        let population: Vec<PersonId> = self
            .world
            .all_people()
            .iter()
            .filter(|person| city_name.is_none_or(|city| person.get_city_name() == city))
            .map(|person| person.get_id())
            .collect();

        let num_immune = (population.len() as f64 * per_to_immune).round() as usize;
        if population.len() < num_infected + num_immune {
            return Err(EpidayError::EpidayError(format!(
                "trying to immunize {num_immune} and infect {num_infected} people out of {}",
                population.len()
            )));
        }

        // Immunize first, drawing directly from the age-eligible subset.
        let eligible: Vec<PersonId> = population
            .iter()
            .copied()
            .filter(|id| self.world.get_person_from_id(*id).get_age() >= min_age)
            .collect();
        if eligible.len() < num_immune {
            return Err(EpidayError::EpidayError(format!(
                "only {} people of age {min_age}+ are available to immunize, {num_immune} requested",
                eligible.len()
            )));
        }
        let immunized: FxHashSet<PersonId> = index::sample(&mut self.rng, eligible.len(), num_immune)
            .into_iter()
            .map(|chosen| eligible[chosen])
            .collect();
        for &id in &immunized {
            let events = self.world.immunize_person(id, self.date);
            self.register_events(events);
        }

        // Then infect among the remaining susceptible individuals.
        let susceptible: Vec<PersonId> = population
            .iter()
            .copied()
            .filter(|id| !immunized.contains(id))
            .filter(|id| {
                self.world
                    .get_person_from_id(*id)
                    .get_disease_state()
                    .is_susceptible()
            })
            .collect();
        if susceptible.len() < num_infected {
            return Err(EpidayError::EpidayError(format!(
                "only {} susceptible people remain, {num_infected} infections requested",
                susceptible.len()
            )));
        }
        for chosen in index::sample(&mut self.rng, susceptible.len(), num_infected) {
            let id = susceptible[chosen];
            let events = self.world.infect_person(
                id,
                self.date,
                InfectionSource::Seed,
                None,
                &self.params.disease,
                &mut self.rng,
            );
            self.register_events(events);
        }
        Ok(())
    }

    /// Immunizes a fraction of households outright ("safe" households) and
    /// infects a given number of people drawn from the susceptible members
    /// of the remaining households. The infection draw is capped at however
    /// many susceptible people exist outside the safe households.
    ///
    /// # Errors
    ///
    /// Fails if seeding already ran.
    pub fn immune_households_infect_others(
        &mut self,
        num_infected: usize,
        infection_doc: &str,
        per_to_immune: f64,
        city_name: Option<&str>,
        min_age: u32,
    ) -> Result<(), EpidayError> {
        self.initial_infection_doc
            .configure(infection_doc.to_string(), "initial infection seeding")?;

        let mut households: Vec<_> = self
            .world
            .get_all_city_households()
            .into_iter()
            .filter(|id| {
                city_name.is_none_or(|city| self.world.all_environments()[id.0].city() == city)
            })
            .collect();
        let num_safe = ((per_to_immune * households.len() as f64) as usize).min(households.len());
        households.shuffle(&mut self.rng);
        let (safe_group, not_safe_group) = households.split_at(num_safe);

        // Immunize the age-eligible members of the safe group.
        let safe_members: Vec<PersonId> = safe_group
            .iter()
            .flat_map(|id| self.world.all_environments()[id.0].members().to_vec())
            .filter(|id| self.world.get_person_from_id(*id).get_age() >= min_age)
            .collect();
        for id in safe_members {
            let events = self.world.immunize_person(id, self.date);
            self.register_events(events);
        }

        // Draw the infected cohort from the unsafe group's susceptibles,
        // capped at availability.
        let unsafe_people: Vec<PersonId> = not_safe_group
            .iter()
            .flat_map(|id| self.world.all_environments()[id.0].members().to_vec())
            .filter(|id| {
                self.world
                    .get_person_from_id(*id)
                    .get_disease_state()
                    .is_susceptible()
            })
            .collect();
        let num_to_infect = num_infected.min(unsafe_people.len());
        for chosen in index::sample(&mut self.rng, unsafe_people.len(), num_to_infect) {
            let id = unsafe_people[chosen];
            let events = self.world.infect_person(
                id,
                self.date,
                InfectionSource::Seed,
                None,
                &self.params.disease,
                &mut self.rng,
            );
            self.register_events(events);
        }
        Ok(())
    }

    /// Infects a chosen, specific set of people and registers their events.
    ///
    /// Seed dates may lie before the simulation's current date to model
    /// pre-existing imports: after registering, every pending bundle dated
    /// strictly before the current date is applied in chronological order,
    /// then the current date is restored, so backdated seeds arrive fully
    /// progressed. Their infection dates are cleared to keep them out of
    /// the reproduction-number window.
    ///
    /// # Errors
    ///
    /// Fails if seeding already ran.
    pub fn infect_chosen_set(
        &mut self,
        infection_datas: &[ChosenInfection],
        infection_doc: &str,
    ) -> Result<(), EpidayError> {
        self.initial_infection_doc
            .configure(infection_doc.to_string(), "initial infection seeding")?;

        for chosen in infection_datas {
            let events = self.world.infect_person(
                chosen.person,
                chosen.date,
                InfectionSource::Seed,
                chosen.seir_times.clone(),
                &self.params.disease,
                &mut self.rng,
            );
            if let Some(data) = self.world.person_mut(chosen.person).infection_data_mut() {
                // Keep pre-simulation imports out of the R window.
                data.date = None;
            }
            self.register_events(events);
        }

        // Rewind: replay everything dated before the real current date so
        // backdated seeds progress their state machines, then restore.
        let original_date = self.date;
        let mut past_dates: Vec<SimDate> = self
            .calendar
            .keys()
            .copied()
            .filter(|date| *date < original_date)
            .collect();
        past_dates.sort_unstable();
        for date in past_dates {
            self.date = date;
            if let Some(bundle) = self.calendar.remove(&date) {
                self.applying = true;
                bundle.apply(self);
                self.applying = false;
            }
        }
        self.date = original_date;
        Ok(())
    }
}

/// The initial immune set can come from two sources: immunizing a share of
/// the general population at random, or immunizing whole households.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum InitialImmuneSource {
    GeneralPopulation,
    Households,
}

/// A serializable description of a seeding policy. Its `Display` form is
/// the provenance string written to the inputs file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitialInfectionParams {
    pub num_to_infect: usize,
    pub per_to_immune: f64,
    pub city_name: Option<String>,
    pub immune_source: InitialImmuneSource,
    pub min_age: u32,
}

impl InitialInfectionParams {
    /// Infects `num_to_infect` random people in `city_name`, or in the
    /// entire world if no city is given.
    ///
    /// # Errors
    ///
    /// Propagates the underlying protocol's errors.
    pub fn apply(&self, simulation: &mut Simulation) -> Result<(), EpidayError> {
        let doc = self.to_string();
        match self.immune_source {
            InitialImmuneSource::GeneralPopulation => simulation.infect_random_set(
                self.num_to_infect,
                &doc,
                self.per_to_immune,
                self.city_name.as_deref(),
                self.min_age,
            ),
            InitialImmuneSource::Households => simulation.immune_households_infect_others(
                self.num_to_infect,
                &doc,
                self.per_to_immune,
                self.city_name.as_deref(),
                self.min_age,
            ),
        }
    }
}

impl Display for InitialInfectionParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "InitialInfectionParams(num_to_infect={}, per_to_immune={}, city_name={:?}, \
             immune_source={:?}, min_age={})",
            self.num_to_infect, self.per_to_immune, self.city_name, self.immune_source, self.min_age
        )
    }
}
