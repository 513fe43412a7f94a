//! The statistics sink.
//!
//! Accumulates one [`DayStats`] snapshot of the changed population per
//! simulated day and, when the run finishes, writes the output artifacts:
//! a JSON dump of the raw records, CSV series for requested state sums and
//! the reproduction-number data, text summaries, the resolved parameters,
//! and input/intervention provenance. All artifacts land in the output
//! directory the sink was constructed with.

pub mod r0;

pub use r0::{calculate_r0_data, R0Data};

use crate::date::SimDate;
use crate::disease::DiseaseState;
use crate::error::EpidayError;
use crate::parameters::Params;
use crate::world::{Person, PersonId, World};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// A named selection of disease states whose daily counts are summed into
/// one output series.
#[derive(Debug, Clone)]
pub struct DataToPlot {
    pub name: String,
    pub states: Vec<DiseaseState>,
}

/// The per-day snapshot of everyone who changed that day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayStats {
    pub date: SimDate,
    /// Number of people whose state changed this day.
    pub changed: usize,
    /// Disease states of the changed people.
    pub state_counts: BTreeMap<DiseaseState, usize>,
    /// Changed people who entered the infected states today.
    pub new_infections: usize,
    /// Changed people who left the infected states today.
    pub new_removals: usize,
}

impl DayStats {
    /// Snapshots the changed population. Transitions are derived by
    /// comparing each person's current state against the state saved at the
    /// end of the previous day.
    #[must_use]
    pub fn collect(date: SimDate, world: &World, changed: &[PersonId]) -> DayStats {
        let mut state_counts: BTreeMap<DiseaseState, usize> = BTreeMap::new();
        let mut new_infections = 0;
        let mut new_removals = 0;
        for &id in changed {
            let person = world.get_person_from_id(id);
            let state = person.get_disease_state();
            *state_counts.entry(state).or_default() += 1;

            let was_infected = person
                .last_state()
                .is_some_and(|last| last.disease_state.is_infected());
            if !was_infected && state.is_infected() {
                new_infections += 1;
            }
            if was_infected && !state.is_infected() {
                new_removals += 1;
            }
        }
        DayStats {
            date,
            changed: changed.len(),
            state_counts,
            new_infections,
            new_removals,
        }
    }
}

/// The full-population census taken when the run ends.
#[derive(Debug, Clone, Serialize)]
pub struct EndingStats {
    pub date: SimDate,
    pub state_census: BTreeMap<DiseaseState, usize>,
}

/// The provenance record the engine hands over for the inputs file.
#[derive(Debug, Clone)]
pub struct SimulationInputs {
    pub initial_date: SimDate,
    pub num_days: Option<u32>,
    pub population_size: usize,
    pub initial_infection_doc: Option<String>,
}

#[derive(Serialize)]
struct StatisticsDump<'a> {
    daily: &'a [DayStats],
    interventions: &'a [String],
    ending: &'a Option<EndingStats>,
}

#[derive(Serialize, Deserialize)]
struct DailySumRow {
    date: SimDate,
    count: usize,
}

#[derive(Serialize)]
struct R0Row {
    date: SimDate,
    avg_r0: f64,
    smoothed_avg_r0: f64,
}

#[derive(Serialize, Deserialize)]
struct InterventionRow {
    index: usize,
    description: String,
}

pub struct Statistics {
    outdir: PathBuf,
    daily: Vec<DayStats>,
    interventions: Vec<String>,
    /// Running tally of people currently in the infected states, derived
    /// from the daily snapshots.
    active_infected: i64,
    r0_data: Option<R0Data>,
    ending: Option<EndingStats>,
}

impl Statistics {
    /// Creates the sink, creating the output directory (and parents) if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an `EpidayError` if the directory cannot be created.
    pub fn new(outdir: &Path) -> Result<Statistics, EpidayError> {
        create_dir_all(outdir)?;
        Ok(Statistics {
            outdir: outdir.to_path_buf(),
            daily: Vec::new(),
            interventions: Vec::new(),
            active_infected: 0,
            r0_data: None,
            ending: None,
        })
    }

    pub fn add_intervention(&mut self, description: String) {
        self.interventions.push(description);
    }

    #[must_use]
    pub fn interventions(&self) -> &[String] {
        &self.interventions
    }

    pub fn add_daily_data(&mut self, day: DayStats) {
        self.active_infected += day.new_infections as i64;
        self.active_infected -= day.new_removals as i64;
        self.daily.push(day);
    }

    #[must_use]
    pub fn daily(&self) -> &[DayStats] {
        &self.daily
    }

    /// Saturation signal for the run loop: nothing changed on the latest
    /// recorded day and nobody is still infected, so no future change can
    /// originate from the disease process.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.active_infected == 0
            && self
                .daily
                .last()
                .is_some_and(|day| day.changed == 0)
    }

    /// Takes the final full-population census.
    pub fn mark_ending(&mut self, people: &[Person]) {
        let mut state_census: BTreeMap<DiseaseState, usize> = BTreeMap::new();
        for person in people {
            *state_census.entry(person.get_disease_state()).or_default() += 1;
        }
        let date = self
            .daily
            .last()
            .map_or(SimDate::new(0), |day| day.date);
        self.ending = Some(EndingStats { date, state_census });
    }

    /// Computes the reproduction-number series, truncated at `max_date`
    /// when an observation window was configured.
    pub fn calc_r0_data(&mut self, people: &[Person], max_date: Option<SimDate>) {
        self.r0_data = calculate_r0_data(people, max_date);
    }

    #[must_use]
    pub fn has_r0_data(&self) -> bool {
        self.r0_data.is_some()
    }

    #[must_use]
    pub fn r0_data(&self) -> Option<&R0Data> {
        self.r0_data.as_ref()
    }

    /// Dumps the raw records as JSON.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn dump(&self, filename: &str) -> Result<(), EpidayError> {
        let file = File::create(self.outdir.join(filename))?;
        serde_json::to_writer_pretty(
            file,
            &StatisticsDump {
                daily: &self.daily,
                interventions: &self.interventions,
                ending: &self.ending,
            },
        )?;
        Ok(())
    }

    /// Writes the daily sum of the given states as a CSV series named
    /// `daily_sum_<name>.csv`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn plot_daily_sum(&self, name: &str, states: &[DiseaseState]) -> Result<(), EpidayError> {
        let mut writer = self.csv_writer(&format!("daily_sum_{name}.csv"))?;
        for day in &self.daily {
            let count: usize = states
                .iter()
                .map(|state| day.state_counts.get(state).copied().unwrap_or(0))
                .sum();
            writer.serialize(DailySumRow {
                date: day.date,
                count,
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the reproduction-number series as `<name>.csv`.
    ///
    /// # Errors
    ///
    /// Fails if no R data was computed or the file cannot be written.
    pub fn plot_r0_data(&self, name: &str) -> Result<(), EpidayError> {
        let data = self.r0_data.as_ref().ok_or_else(|| {
            EpidayError::ReportError("no reproduction-number data was computed".to_string())
        })?;
        let mut writer = self.csv_writer(&format!("{name}.csv"))?;
        for (i, &date) in data.dates.iter().enumerate() {
            writer.serialize(R0Row {
                date,
                avg_r0: data.avg_r0[i],
                smoothed_avg_r0: data.smoothed_avg_r0[i],
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes a text summary as `<name>.txt`. The shortened form carries
    /// only the totals; the long form appends one line per recorded day.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn write_summary_file(&self, name: &str, shortened: bool) -> Result<(), EpidayError> {
        let mut file = File::create(self.outdir.join(format!("{name}.txt")))?;
        writeln!(file, "simulation summary")?;
        writeln!(file, "==================")?;
        writeln!(file, "days recorded: {}", self.daily.len())?;
        let total_infections: usize = self.daily.iter().map(|d| d.new_infections).sum();
        writeln!(file, "total new infections: {total_infections}")?;
        if let Some(ending) = &self.ending {
            let population: usize = ending.state_census.values().sum();
            writeln!(file, "population: {population}")?;
            writeln!(
                file,
                "deceased: {}",
                ending
                    .state_census
                    .get(&DiseaseState::Deceased)
                    .copied()
                    .unwrap_or(0)
            )?;
            writeln!(file, "final census as of {}:", ending.date)?;
            for (state, count) in &ending.state_census {
                writeln!(file, "  {state}: {count}")?;
            }
        }
        if let Some(peak) = self.daily.iter().max_by_key(|d| d.new_infections) {
            if peak.new_infections > 0 {
                writeln!(
                    file,
                    "peak: {} new infections on {}",
                    peak.new_infections, peak.date
                )?;
            }
        }
        if !shortened {
            writeln!(file)?;
            for day in &self.daily {
                writeln!(
                    file,
                    "{}: changed {}, new infections {}, removals {}",
                    day.date, day.changed, day.new_infections, day.new_removals
                )?;
            }
        }
        Ok(())
    }

    /// Writes the resolved parameter tree as `params.json`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn write_params(&self, params: &Params) -> Result<(), EpidayError> {
        let file = File::create(self.outdir.join("params.json"))?;
        serde_json::to_writer_pretty(file, params)?;
        Ok(())
    }

    /// Writes the run's input provenance as `inputs.txt`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn write_inputs(&self, inputs: &SimulationInputs) -> Result<(), EpidayError> {
        let mut file = File::create(self.outdir.join("inputs.txt"))?;
        writeln!(file, "initial date: {}", inputs.initial_date)?;
        match inputs.num_days {
            Some(num_days) => writeln!(file, "days to run: {num_days}")?,
            None => writeln!(file, "days to run: not configured")?,
        }
        writeln!(file, "population size: {}", inputs.population_size)?;
        writeln!(
            file,
            "initial infection: {}",
            inputs
                .initial_infection_doc
                .as_deref()
                .unwrap_or("none")
        )?;
        Ok(())
    }

    /// Writes one CSV row per registered intervention as
    /// `interventions.csv`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn write_interventions_inputs_csv(&self) -> Result<(), EpidayError> {
        let mut writer = self.csv_writer("interventions.csv")?;
        for (index, description) in self.interventions.iter().enumerate() {
            writer.serialize(InterventionRow {
                index,
                description: description.clone(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    // Statistics tables are CSVs; anything else is a caller bug surfaced as
    // a report error, not a panic.
    fn csv_writer(&self, filename: &str) -> Result<Writer<File>, EpidayError> {
        let path = self.outdir.join(filename);
        match path.extension().and_then(OsStr::to_str) {
            Some("csv") => Ok(Writer::from_writer(File::create(path)?)),
            _ => Err(EpidayError::ReportError(format!(
                "statistics tables must be CSVs, got '{filename}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DayStats, SimulationInputs, Statistics};
    use crate::date::SimDate;
    use crate::disease::DiseaseState;
    use crate::parameters::{DiseaseParams, Params};
    use crate::world::{InfectionSource, World};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn day(date: u32, changed: usize, infections: usize, removals: usize) -> DayStats {
        DayStats {
            date: SimDate::new(date),
            changed,
            state_counts: BTreeMap::new(),
            new_infections: infections,
            new_removals: removals,
        }
    }

    #[test]
    fn collect_derives_transitions_from_saved_state() {
        let mut world = World::new();
        let person = world.add_person(30, "testville", &[], 0.5);
        let mut rng = StdRng::seed_from_u64(0);
        world.infect_person(
            person,
            SimDate::new(0),
            InfectionSource::Seed,
            None,
            &DiseaseParams::default(),
            &mut rng,
        );

        let stats = DayStats::collect(SimDate::new(0), &world, &[person]);
        assert_eq!(stats.changed, 1);
        assert_eq!(stats.new_infections, 1);
        assert_eq!(stats.new_removals, 0);
        assert_eq!(stats.state_counts[&DiseaseState::Latent], 1);

        // After saving, a transition to immune registers as a removal.
        world.person_mut(person).save_state();
        world.person_mut(person).set_disease_state(DiseaseState::Immune);
        let stats = DayStats::collect(SimDate::new(1), &world, &[person]);
        assert_eq!(stats.new_infections, 0);
        assert_eq!(stats.new_removals, 1);
    }

    #[test]
    fn is_static_requires_quiet_day_and_no_active_infected() {
        let dir = tempfile::tempdir().unwrap();
        let mut stats = Statistics::new(dir.path()).unwrap();
        assert!(!stats.is_static());

        stats.add_daily_data(day(0, 3, 1, 0));
        assert!(!stats.is_static());

        // Quiet day, but one person is still infected.
        stats.add_daily_data(day(1, 0, 0, 0));
        assert!(!stats.is_static());

        stats.add_daily_data(day(2, 1, 0, 1));
        assert!(!stats.is_static());

        stats.add_daily_data(day(3, 0, 0, 0));
        assert!(stats.is_static());
    }

    #[test]
    fn output_files_are_written_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let mut stats = Statistics::new(dir.path()).unwrap();
        stats.add_intervention("TestIntervention(start=day 0)".to_string());
        let mut counts = BTreeMap::new();
        counts.insert(DiseaseState::Latent, 2);
        stats.add_daily_data(DayStats {
            date: SimDate::new(0),
            changed: 2,
            state_counts: counts,
            new_infections: 2,
            new_removals: 0,
        });

        let mut world = World::new();
        world.add_person(30, "testville", &[], 0.5);
        stats.mark_ending(world.all_people());

        stats.dump("statistics.json").unwrap();
        stats
            .plot_daily_sum("infected", &[DiseaseState::Latent])
            .unwrap();
        stats.write_summary_file("summary", true).unwrap();
        stats.write_summary_file("summary_long", false).unwrap();
        stats.write_params(&Params::default()).unwrap();
        stats
            .write_inputs(&SimulationInputs {
                initial_date: SimDate::new(0),
                num_days: Some(10),
                population_size: 1,
                initial_infection_doc: Some("test seeding".to_string()),
            })
            .unwrap();
        stats.write_interventions_inputs_csv().unwrap();

        for filename in [
            "statistics.json",
            "daily_sum_infected.csv",
            "summary.txt",
            "summary_long.txt",
            "params.json",
            "inputs.txt",
            "interventions.csv",
        ] {
            assert!(dir.path().join(filename).exists(), "{filename} missing");
        }

        // The CSV series round-trips through the csv reader.
        let mut reader =
            csv::Reader::from_path(dir.path().join("daily_sum_infected.csv")).unwrap();
        let rows: Vec<super::DailySumRow> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 2);

        let inputs = std::fs::read_to_string(dir.path().join("inputs.txt")).unwrap();
        assert!(inputs.contains("test seeding"));
    }

    #[test]
    fn non_csv_table_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let stats = Statistics::new(dir.path()).unwrap();
        assert!(stats.csv_writer("table.tsv").is_err());
    }
}
