//! The infection natural-history state machine.
//!
//! A person's position in the disease course is a [`DiseaseState`]. The full
//! course of one infection is sampled up front as a list of
//! `(state, duration)` stages — the driver turns those into dated events, so
//! disease progression costs nothing on days where no transition fires.

use crate::parameters::DiseaseParams;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// One stage of a sampled disease course: the state entered, and how many
/// whole days it lasts. The terminal stage carries `None`.
pub type SeirStage = (DiseaseState, Option<u32>);

#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
pub enum DiseaseState {
    Susceptible,
    Latent,
    Asymptomatic,
    Symptomatic,
    Critical,
    Immune,
    Deceased,
}

impl DiseaseState {
    #[must_use]
    pub fn is_susceptible(self) -> bool {
        self == DiseaseState::Susceptible
    }

    /// Infected means carrying the pathogen, whether or not yet contagious.
    #[must_use]
    pub fn is_infected(self) -> bool {
        matches!(
            self,
            DiseaseState::Latent
                | DiseaseState::Asymptomatic
                | DiseaseState::Symptomatic
                | DiseaseState::Critical
        )
    }

    #[must_use]
    pub fn is_infectious(self) -> bool {
        matches!(
            self,
            DiseaseState::Asymptomatic | DiseaseState::Symptomatic | DiseaseState::Critical
        )
    }

    #[must_use]
    pub fn is_dead(self) -> bool {
        self == DiseaseState::Deceased
    }

    /// Terminal states have no further transitions scheduled.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DiseaseState::Immune | DiseaseState::Deceased)
    }

    /// Per-state scaling of a person's transmission probability.
    #[must_use]
    pub fn infectiousness_factor(self, params: &DiseaseParams) -> f64 {
        match self {
            DiseaseState::Asymptomatic => params.asymptomatic_infectiousness_factor,
            DiseaseState::Symptomatic => 1.0,
            DiseaseState::Critical => params.critical_infectiousness_factor,
            _ => 0.0,
        }
    }
}

impl Display for DiseaseState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Samples a complete disease course, from the latent stage entered at
/// infection through removal (immunity or death).
///
/// The first stage is always `Latent`; the last stage is terminal with a
/// `None` duration.
pub fn sample_seir_times(params: &DiseaseParams, rng: &mut StdRng) -> Vec<SeirStage> {
    let mut stages = vec![(
        DiseaseState::Latent,
        Some(params.latent_period.sample(rng)),
    )];

    if rng.random_bool(params.symptomatic_given_infected) {
        stages.push((
            DiseaseState::Symptomatic,
            Some(params.symptomatic_period.sample(rng)),
        ));
        if rng.random_bool(params.critical_given_symptomatic) {
            stages.push((
                DiseaseState::Critical,
                Some(params.critical_period.sample(rng)),
            ));
            if rng.random_bool(params.death_given_critical) {
                stages.push((DiseaseState::Deceased, None));
                return stages;
            }
        }
    } else {
        stages.push((
            DiseaseState::Asymptomatic,
            Some(params.asymptomatic_period.sample(rng)),
        ));
    }
    stages.push((DiseaseState::Immune, None));
    stages
}

#[cfg(test)]
mod tests {
    use super::{sample_seir_times, DiseaseState};
    use crate::parameters::DiseaseParams;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn predicates_partition_states() {
        use DiseaseState::*;
        for state in [
            Susceptible,
            Latent,
            Asymptomatic,
            Symptomatic,
            Critical,
            Immune,
            Deceased,
        ] {
            // Infectious implies infected; susceptible excludes both.
            if state.is_infectious() {
                assert!(state.is_infected());
            }
            if state.is_susceptible() {
                assert!(!state.is_infected());
                assert!(!state.is_terminal());
            }
        }
        assert!(Latent.is_infected());
        assert!(!Latent.is_infectious());
        assert!(Deceased.is_dead());
        assert!(Immune.is_terminal());
    }

    #[test]
    fn sampled_course_starts_latent_and_ends_terminal() {
        let params = DiseaseParams::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let stages = sample_seir_times(&params, &mut rng);
            assert_eq!(stages[0].0, DiseaseState::Latent);
            let (last_state, last_duration) = *stages.last().unwrap();
            assert!(last_state.is_terminal());
            assert!(last_duration.is_none());
            // Every non-terminal stage has a positive whole-day duration.
            for (_, duration) in &stages[..stages.len() - 1] {
                assert!(duration.unwrap() >= 1);
            }
        }
    }

    #[test]
    fn always_symptomatic_course_can_reach_death() {
        let params = DiseaseParams {
            symptomatic_given_infected: 1.0,
            critical_given_symptomatic: 1.0,
            death_given_critical: 1.0,
            ..DiseaseParams::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let stages = sample_seir_times(&params, &mut rng);
        let states: Vec<DiseaseState> = stages.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            states,
            vec![
                DiseaseState::Latent,
                DiseaseState::Symptomatic,
                DiseaseState::Critical,
                DiseaseState::Deceased
            ]
        );
    }

    #[test]
    fn never_symptomatic_course_is_asymptomatic_then_immune() {
        let params = DiseaseParams {
            symptomatic_given_infected: 0.0,
            ..DiseaseParams::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let stages = sample_seir_times(&params, &mut rng);
        let states: Vec<DiseaseState> = stages.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            states,
            vec![
                DiseaseState::Latent,
                DiseaseState::Asymptomatic,
                DiseaseState::Immune
            ]
        );
    }
}
