//! Environments: the groups across which infection propagates.
//!
//! Every environment is a homogeneous-mixing group — a household, workplace,
//! school, or the city-wide community — with a fixed member list and a daily
//! attendance map rebuilt from people's routines. Contagion is computed per
//! environment per day: infectious attendees exert pressure, susceptible
//! attendees draw against it.

use crate::date::SimDate;
use crate::parameters::DiseaseParams;
use crate::world::person::{Person, PersonId};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A unique identifier for an environment in the world.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct EnvironmentId(pub usize);

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum EnvironmentKind {
    Household,
    Workplace,
    School,
    CityCommunity,
}

impl Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// An infection an environment decided on, before it is applied to the
/// world. The environment cannot mutate people it does not own, so it
/// returns its verdicts and the world turns them into state changes and
/// events.
#[derive(Copy, Clone, Debug)]
pub struct PlannedInfection {
    pub victim: PersonId,
    pub transmitter: PersonId,
}

pub struct Environment {
    id: EnvironmentId,
    kind: EnvironmentKind,
    city: String,
    /// Scales the daily infection hazard between each infectious/susceptible
    /// pair of attendees.
    contact_prob: f64,
    members: Vec<PersonId>,
    attendance: FxHashMap<PersonId, f64>,
}

impl Environment {
    pub(crate) fn new(
        id: EnvironmentId,
        kind: EnvironmentKind,
        city: &str,
        contact_prob: f64,
    ) -> Environment {
        Environment {
            id,
            kind,
            city: city.to_string(),
            contact_prob,
            members: Vec::new(),
            attendance: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> EnvironmentId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> EnvironmentKind {
        self.kind
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub fn members(&self) -> &[PersonId] {
        &self.members
    }

    pub(crate) fn add_member(&mut self, person: PersonId) {
        self.members.push(person);
    }

    /// Today's weight for the given attendee, zero if not signed up.
    #[must_use]
    pub fn attendance_weight(&self, person: PersonId) -> f64 {
        self.attendance.get(&person).copied().unwrap_or(0.0)
    }

    /// Records (or overwrites) a member's attendance weight for the current
    /// day. People re-register only when their routine changed.
    pub fn sign_up_for_today(&mut self, person: PersonId, weight: f64) {
        self.attendance.insert(person, weight);
    }

    /// Runs one day of homogeneous mixing and returns the infections to
    /// apply.
    ///
    /// Infectious attendees contribute `weight × per-contact probability`
    /// to the environment's pressure; each susceptible attendee with weight
    /// `w` is infected with probability `1 − exp(−contact_prob × pressure ×
    /// w)`. Transmitters are attributed proportionally to their
    /// contribution.
    pub fn propagate_infection(
        &self,
        date: SimDate,
        people: &[Person],
        params: &DiseaseParams,
        rng: &mut StdRng,
    ) -> Vec<PlannedInfection> {
        // Walk the member list rather than the attendance map so the rng
        // draw order is stable for a given seed.
        let mut contributors: Vec<(PersonId, f64)> = Vec::new();
        for &id in &self.members {
            let weight = self.attendance_weight(id);
            if weight <= 0.0 {
                continue;
            }
            let person = &people[id.0];
            if person.is_infectious() {
                let contribution = weight * person.prob_to_infect_on_contact(params);
                if contribution > 0.0 {
                    contributors.push((id, contribution));
                }
            }
        }
        let pressure: f64 = contributors.iter().map(|(_, c)| c).sum();
        if pressure <= 0.0 {
            return Vec::new();
        }

        let mut infections = Vec::new();
        for &id in &self.members {
            let weight = self.attendance_weight(id);
            if weight <= 0.0 {
                continue;
            }
            let person = &people[id.0];
            if !person.get_disease_state().is_susceptible() {
                continue;
            }
            let prob = 1.0 - (-self.contact_prob * pressure * weight).exp();
            if rng.random_bool(prob.clamp(0.0, 1.0)) {
                let &(transmitter, _) = contributors
                    .choose_weighted(rng, |(_, contribution)| *contribution)
                    .unwrap();
                infections.push(PlannedInfection {
                    victim: id,
                    transmitter,
                });
            }
        }
        if !infections.is_empty() {
            log::trace!(
                "{} {:?} in {}: {} new infections on {}",
                self.kind,
                self.id,
                self.city,
                infections.len(),
                date
            );
        }
        infections
    }
}

#[cfg(test)]
mod tests {
    use super::{Environment, EnvironmentId, EnvironmentKind};
    use crate::date::SimDate;
    use crate::disease::DiseaseState;
    use crate::parameters::DiseaseParams;
    use crate::world::person::{InfectionSource, Person, PersonId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_person_household(contact_prob: f64) -> (Environment, Vec<Person>) {
        let mut env = Environment::new(
            EnvironmentId(0),
            EnvironmentKind::Household,
            "testville",
            contact_prob,
        );
        let mut people = Vec::new();
        for i in 0..2 {
            let mut person = Person::new(PersonId(i), 40, "testville", 1.0);
            person.add_environment(env.id(), env.kind());
            env.add_member(person.get_id());
            env.sign_up_for_today(person.get_id(), 1.0);
            people.push(person);
        }
        (env, people)
    }

    fn make_infectious(person: &mut Person, rng: &mut StdRng) {
        person.infect_and_get_events(
            SimDate::new(0),
            InfectionSource::Seed,
            Some(vec![
                (DiseaseState::Latent, Some(1)),
                (DiseaseState::Symptomatic, Some(5)),
                (DiseaseState::Immune, None),
            ]),
            &DiseaseParams::default(),
            rng,
        );
        person.set_disease_state(DiseaseState::Symptomatic);
    }

    #[test]
    fn no_infectious_attendees_means_no_infections() {
        let (env, people) = two_person_household(1.0);
        let mut rng = StdRng::seed_from_u64(0);
        let infections =
            env.propagate_infection(SimDate::new(0), &people, &DiseaseParams::default(), &mut rng);
        assert!(infections.is_empty());
    }

    #[test]
    fn certain_transmission_infects_every_susceptible() {
        // A contact probability this large drives the infection probability
        // to 1 in f64, making the draw deterministic.
        let (env, mut people) = two_person_household(1000.0);
        let mut rng = StdRng::seed_from_u64(0);
        make_infectious(&mut people[0], &mut rng);

        let infections =
            env.propagate_infection(SimDate::new(0), &people, &DiseaseParams::default(), &mut rng);
        assert_eq!(infections.len(), 1);
        assert_eq!(infections[0].victim, PersonId(1));
        assert_eq!(infections[0].transmitter, PersonId(0));
    }

    #[test]
    fn zero_attendance_weight_shields_from_infection() {
        let (mut env, mut people) = two_person_household(1000.0);
        let mut rng = StdRng::seed_from_u64(0);
        make_infectious(&mut people[0], &mut rng);
        // The susceptible member stays home today.
        env.sign_up_for_today(PersonId(1), 0.0);

        let infections =
            env.propagate_infection(SimDate::new(0), &people, &DiseaseParams::default(), &mut rng);
        assert!(infections.is_empty());
    }

    #[test]
    fn zero_contact_prob_never_transmits() {
        let (env, mut people) = two_person_household(0.0);
        let mut rng = StdRng::seed_from_u64(0);
        make_infectious(&mut people[0], &mut rng);

        let infections =
            env.propagate_infection(SimDate::new(0), &people, &DiseaseParams::default(), &mut rng);
        assert!(infections.is_empty());
    }
}
