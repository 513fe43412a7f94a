//! Resolved simulation parameters.
//!
//! All tunable quantities live in a single [`Params`] tree that can be
//! deserialized from a JSON config file (any omitted field falls back to the
//! baseline default). The resolved tree is written back out at the end of a
//! run by the statistics sink so every output directory records the exact
//! parameters that produced it.

use crate::error::EpidayError;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// A Gamma-distributed whole-day duration, rounded and floored at one day.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct GammaDays {
    pub shape: f64,
    pub scale: f64,
}

impl GammaDays {
    pub fn sample(&self, rng: &mut StdRng) -> u32 {
        let gamma = Gamma::new(self.shape, self.scale).unwrap();
        gamma.sample(rng).round().max(1.0) as u32
    }

    fn validate(&self, what: &str) -> Result<(), EpidayError> {
        if self.shape <= 0.0 || self.scale <= 0.0 {
            return Err(EpidayError::EpidayError(format!(
                "{what}: gamma shape and scale must be positive, got shape={} scale={}",
                self.shape, self.scale
            )));
        }
        Ok(())
    }
}

/// Per-person infectiousness parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonParams {
    /// Baseline per-contact transmission probability before individual
    /// variation is applied.
    pub base_infectiousness: f64,
    pub individual_infectiousness_gamma_shape: f64,
    pub individual_infectiousness_gamma_scale: f64,
}

impl Default for PersonParams {
    fn default() -> Self {
        PersonParams {
            base_infectiousness: 0.5,
            individual_infectiousness_gamma_shape: 0.25,
            individual_infectiousness_gamma_scale: 4.0,
        }
    }
}

/// Natural-history parameters: stage durations and branching probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseParams {
    pub latent_period: GammaDays,
    pub asymptomatic_period: GammaDays,
    pub symptomatic_period: GammaDays,
    pub critical_period: GammaDays,
    pub symptomatic_given_infected: f64,
    pub critical_given_symptomatic: f64,
    pub death_given_critical: f64,
    /// Infectiousness of an asymptomatic case relative to a symptomatic one.
    pub asymptomatic_infectiousness_factor: f64,
    /// Critical cases are largely removed from circulation.
    pub critical_infectiousness_factor: f64,
}

impl Default for DiseaseParams {
    fn default() -> Self {
        DiseaseParams {
            latent_period: GammaDays {
                shape: 4.0,
                scale: 0.75,
            },
            asymptomatic_period: GammaDays {
                shape: 5.0,
                scale: 1.0,
            },
            symptomatic_period: GammaDays {
                shape: 7.0,
                scale: 1.0,
            },
            critical_period: GammaDays {
                shape: 10.0,
                scale: 1.0,
            },
            symptomatic_given_infected: 0.6,
            critical_given_symptomatic: 0.05,
            death_given_critical: 0.3,
            asymptomatic_infectiousness_factor: 0.5,
            critical_infectiousness_factor: 0.2,
        }
    }
}

/// Synthetic-population generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationParams {
    pub num_households: usize,
    pub max_household_size: usize,
    pub workplace_size: usize,
    pub school_size: usize,
    pub school_age_min: u32,
    pub school_age_max: u32,
    pub working_age_min: u32,
    pub working_age_max: u32,
    pub household_contact_prob: f64,
    pub workplace_contact_prob: f64,
    pub school_contact_prob: f64,
    pub community_contact_prob: f64,
}

impl Default for PopulationParams {
    fn default() -> Self {
        PopulationParams {
            num_households: 300,
            max_household_size: 6,
            workplace_size: 20,
            school_size: 40,
            school_age_min: 5,
            school_age_max: 18,
            working_age_min: 19,
            working_age_max: 64,
            household_contact_prob: 0.6,
            workplace_contact_prob: 0.15,
            school_contact_prob: 0.25,
            community_contact_prob: 0.002,
        }
    }
}

/// The full resolved parameter tree for one simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub person: PersonParams,
    pub disease: DiseaseParams,
    pub population: PopulationParams,
}

impl Params {
    /// Loads parameters from a JSON config file. Fields missing from the
    /// file keep their baseline defaults.
    ///
    /// # Errors
    ///
    /// Returns an `EpidayError` if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_from_file(path: &Path) -> Result<Params, EpidayError> {
        let config_file = File::open(path)?;
        let params: Params = serde_json::from_reader(config_file)?;
        params.validate()?;
        Ok(params)
    }

    /// Checks that every probability is in `[0, 1]` and every distribution
    /// is well formed.
    pub fn validate(&self) -> Result<(), EpidayError> {
        self.disease.latent_period.validate("latent_period")?;
        self.disease
            .asymptomatic_period
            .validate("asymptomatic_period")?;
        self.disease
            .symptomatic_period
            .validate("symptomatic_period")?;
        self.disease.critical_period.validate("critical_period")?;
        for (name, p) in [
            (
                "symptomatic_given_infected",
                self.disease.symptomatic_given_infected,
            ),
            (
                "critical_given_symptomatic",
                self.disease.critical_given_symptomatic,
            ),
            ("death_given_critical", self.disease.death_given_critical),
            ("base_infectiousness", self.person.base_infectiousness),
            (
                "household_contact_prob",
                self.population.household_contact_prob,
            ),
            (
                "workplace_contact_prob",
                self.population.workplace_contact_prob,
            ),
            ("school_contact_prob", self.population.school_contact_prob),
            (
                "community_contact_prob",
                self.population.community_contact_prob,
            ),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(EpidayError::EpidayError(format!(
                    "{name} must be a probability in [0, 1], got {p}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{GammaDays, Params};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        Params::default().validate().unwrap();
    }

    #[test]
    fn gamma_days_is_at_least_one_day() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = GammaDays {
            shape: 0.1,
            scale: 0.1,
        };
        for _ in 0..100 {
            assert!(dist.sample(&mut rng) >= 1);
        }
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"disease": {{"symptomatic_given_infected": 0.25}}}}"#
        )
        .unwrap();

        let params = Params::load_from_file(&path).unwrap();
        assert_eq!(params.disease.symptomatic_given_infected, 0.25);
        // Untouched fields fall back to the baseline.
        assert_eq!(
            params.population.num_households,
            Params::default().population.num_households
        );
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let mut params = Params::default();
        params.disease.death_given_critical = 1.5;
        assert!(params.validate().is_err());
    }

    #[test]
    fn params_round_trip() {
        let params = Params::default();
        let text = serde_json::to_string(&params).unwrap();
        let parsed: Params = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed.population.workplace_size,
            params.population.workplace_size
        );
    }
}
