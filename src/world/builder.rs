//! Synthetic-population generation.
//!
//! Builds a single-city world: households with sampled sizes and ages, one
//! workplace per `workplace_size` working-age adults, one school per
//! `school_size` school-age children, and a city-wide community environment
//! everyone belongs to. This stands in for census-driven population loading,
//! which is out of scope for the engine.

use crate::parameters::Params;
use crate::world::environment::EnvironmentKind;
use crate::world::person::{sample_infectiousness, PersonId};
use crate::world::World;
use rand::rngs::StdRng;
use rand::Rng;

pub struct WorldBuilder<'a> {
    params: &'a Params,
    city: String,
}

impl<'a> WorldBuilder<'a> {
    #[must_use]
    pub fn new(params: &'a Params, city: &str) -> WorldBuilder<'a> {
        WorldBuilder {
            params,
            city: city.to_string(),
        }
    }

    /// Generates the world. Deterministic for a given rng state.
    pub fn build(&self, rng: &mut StdRng) -> World {
        let population = &self.params.population;
        let mut world = World::new();
        let community = world.add_environment(
            EnvironmentKind::CityCommunity,
            &self.city,
            population.community_contact_prob,
        );

        let mut workers: Vec<PersonId> = Vec::new();
        let mut students: Vec<PersonId> = Vec::new();
        for _ in 0..population.num_households {
            let household = world.add_environment(
                EnvironmentKind::Household,
                &self.city,
                population.household_contact_prob,
            );
            let size = rng.random_range(1..=population.max_household_size);
            for slot in 0..size {
                // The first member is always an adult; the rest span all
                // ages.
                let age = if slot == 0 {
                    rng.random_range(population.working_age_min..=population.working_age_max)
                } else {
                    rng.random_range(0..=80)
                };
                let infectiousness = sample_infectiousness(&self.params.person, rng);
                let person =
                    world.add_person(age, &self.city, &[household, community], infectiousness);
                if (population.working_age_min..=population.working_age_max).contains(&age) {
                    workers.push(person);
                } else if (population.school_age_min..=population.school_age_max).contains(&age) {
                    students.push(person);
                }
            }
        }

        self.assign_group(
            &mut world,
            &workers,
            EnvironmentKind::Workplace,
            population.workplace_size,
            population.workplace_contact_prob,
        );
        self.assign_group(
            &mut world,
            &students,
            EnvironmentKind::School,
            population.school_size,
            population.school_contact_prob,
        );

        log::info!(
            "generated world: {} people, {} environments in {}",
            world.population_size(),
            world.all_environments().len(),
            self.city
        );
        world
    }

    fn assign_group(
        &self,
        world: &mut World,
        people: &[PersonId],
        kind: EnvironmentKind,
        group_size: usize,
        contact_prob: f64,
    ) {
        for chunk in people.chunks(group_size.max(1)) {
            let environment = world.add_environment(kind, &self.city, contact_prob);
            for &person in chunk {
                world.add_person_to_environment(person, environment);
            }
        }
    }
}
