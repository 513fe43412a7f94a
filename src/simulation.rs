//! The simulation driver.
//!
//! A [`Simulation`] runs a single epidemic trajectory: it owns the world,
//! the date-keyed event calendar, the statistics sink and the rng, and
//! advances one day at a time — applying due events, re-registering changed
//! people, propagating contagion through environments, and recording the
//! day's changes. Seeding (see the `seeding` module) and the run loop are
//! each permitted exactly once per instance.

use crate::date::SimDate;
use crate::disease::DiseaseState;
use crate::error::EpidayError;
use crate::event::{DayEvents, Event};
use crate::interventions::Intervention;
use crate::log::info;
use crate::parameters::Params;
use crate::stats::{DataToPlot, DayStats, SimulationInputs, Statistics};
use crate::world::{EnvironmentKind, PersonId, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A guarded one-shot configuration slot. Mutating operations that may run
/// at most once per simulation (seeding, the run loop) transition their
/// slot from `Unconfigured` to `Configured` and fail on a second attempt.
#[derive(Debug)]
pub(crate) enum OneShot<T> {
    Unconfigured,
    Configured(T),
}

impl<T> OneShot<T> {
    pub(crate) fn configure(&mut self, value: T, operation: &str) -> Result<(), EpidayError> {
        match self {
            OneShot::Unconfigured => {
                *self = OneShot::Configured(value);
                Ok(())
            }
            OneShot::Configured(_) => Err(EpidayError::EpidayError(format!(
                "{operation} may only be invoked once per simulation"
            ))),
        }
    }

    pub(crate) fn value(&self) -> Option<&T> {
        match self {
            OneShot::Unconfigured => None,
            OneShot::Configured(value) => Some(value),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EarlyStopKind {
    /// Stop once everyone infected inside the observation window has left
    /// the infected states; used to compute reproduction-number statistics
    /// without running the epidemic to its end.
    ReproductionNumber,
}

/// An opt-in condition that ends the run before `num_days` elapse.
#[derive(Copy, Clone, Debug)]
pub struct EarlyStop {
    kind: EarlyStopKind,
    window_days: u32,
}

impl EarlyStop {
    /// Parses an early-stop request. Only the `"r"` kind is supported; any
    /// other kind is a configuration error.
    pub fn new(kind: &str, window_days: u32) -> Result<EarlyStop, EpidayError> {
        match kind {
            "r" => Ok(EarlyStop {
                kind: EarlyStopKind::ReproductionNumber,
                window_days,
            }),
            other => Err(EpidayError::EpidayError(format!(
                "unsupported early-stop kind '{other}': only \"r\" premature stops are supported"
            ))),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EarlyStopKind {
        self.kind
    }

    #[must_use]
    pub fn window_days(&self) -> u32 {
        self.window_days
    }
}

/// Per-day callbacks supplied by the surrounding application. Hooks run in
/// the order given, before and after each simulated day.
pub trait SimulationHook {
    fn start_of_day(&mut self, simulation: &mut Simulation);
    fn end_of_day(&mut self, simulation: &mut Simulation);
}

/// Construction options for a [`Simulation`].
pub struct SimulationConfig {
    pub interventions: Vec<Box<dyn Intervention>>,
    pub early_stop: Option<EarlyStop>,
    pub verbosity: bool,
    pub outdir: PathBuf,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            interventions: Vec::new(),
            early_stop: None,
            verbosity: false,
            outdir: PathBuf::from("outputs"),
            seed: 0,
        }
    }
}

/// Runs a single simulation: holds a world, applies events and propagates
/// infections throughout environments day by day.
pub struct Simulation {
    pub(crate) world: World,
    pub(crate) date: SimDate,
    pub(crate) initial_date: SimDate,
    pub(crate) calendar: FxHashMap<SimDate, DayEvents>,
    pub(crate) stats: Statistics,
    pub(crate) params: Params,
    pub(crate) rng: StdRng,
    verbosity: bool,
    early_stop: Option<EarlyStop>,
    last_day_to_record_r: Option<SimDate>,
    first_infectious_people: FxHashSet<PersonId>,
    pub(crate) initial_infection_doc: OneShot<String>,
    num_days_to_run: OneShot<u32>,
    /// Raised while a day bundle is being applied; registration is then
    /// restricted to strictly future dates.
    pub(crate) applying: bool,
}

impl Simulation {
    /// Builds a simulation over the given world.
    ///
    /// Everyone is signed up to their environments before interventions are
    /// asked to generate events — intervention event generation may depend
    /// on environment membership.
    ///
    /// # Errors
    ///
    /// Returns an `EpidayError` if the output directory cannot be created.
    pub fn new(
        mut world: World,
        initial_date: SimDate,
        params: Params,
        config: SimulationConfig,
    ) -> Result<Simulation, EpidayError> {
        let SimulationConfig {
            interventions,
            early_stop,
            verbosity,
            outdir,
            seed,
        } = config;
        let stats = Statistics::new(&outdir)?;
        world.sign_all_people_up_to_environments();

        let last_day_to_record_r = early_stop
            .as_ref()
            .map(|stop| initial_date + stop.window_days());

        let mut simulation = Simulation {
            world,
            date: initial_date,
            initial_date,
            calendar: FxHashMap::default(),
            stats,
            params,
            rng: StdRng::seed_from_u64(seed),
            verbosity,
            early_stop,
            last_day_to_record_r,
            first_infectious_people: FxHashSet::default(),
            initial_infection_doc: OneShot::Unconfigured,
            num_days_to_run: OneShot::Unconfigured,
            applying: false,
        };

        for intervention in interventions {
            simulation.stats.add_intervention(intervention.describe());
            let events = intervention.generate_events(&simulation.world, &mut simulation.rng);
            simulation.register_events(events);
        }
        Ok(simulation)
    }

    #[must_use]
    pub fn current_date(&self) -> SimDate {
        self.date
    }

    #[must_use]
    pub fn initial_date(&self) -> SimDate {
        self.initial_date
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The seeding provenance string, once a seeding protocol has run.
    #[must_use]
    pub fn initial_infection_doc(&self) -> Option<&String> {
        self.initial_infection_doc.value()
    }

    /// Simulates one day in four steps:
    /// 1. apply and discard the current date's registered events
    /// 2. re-register people whose weights changed to their environments
    /// 3. spread the infection throughout the environments
    /// 4. record the changes with the statistics sink and advance the date
    pub fn simulate_day(&mut self) {
        if let Some(bundle) = self.calendar.remove(&self.date) {
            self.applying = true;
            bundle.apply(self);
            self.applying = false;
        }

        for id in self.world.changed_people() {
            self.world.register_person_to_daily_environments(id);
        }

        let infection_events =
            self.world
                .propagate_all_environments(self.date, &self.params.disease, &mut self.rng);
        self.register_events(infection_events);

        let changed = self.world.changed_people();

        if self.verbosity && self.date.day_of_week() == 6 {
            self.log_state_histogram();
        }

        let daily_data = DayStats::collect(self.date, &self.world, &changed);
        self.stats.add_daily_data(daily_data);
        for &id in &changed {
            self.world.person_mut(id).save_state();
        }

        if let Some(last_day) = self.last_day_to_record_r {
            if self.date <= last_day {
                for &id in &changed {
                    if self.world.get_person_from_id(id).is_infected() {
                        self.first_infectious_people.insert(id);
                    }
                }
            }
        }
        self.date += 1;
    }

    /// Hooks the given event to the given date, so that it fires on that
    /// day.
    ///
    /// # Panics
    ///
    /// Panics if called while a day bundle is being applied with a date that
    /// is not strictly in the future. (The seeding rewind registers
    /// backdated events, but does so outside bundle application.)
    pub fn register_event_on_day(&mut self, event: Event, date: SimDate) {
        assert!(
            !self.applying || date > self.date,
            "an event applied on {} tried to register work on {date}; \
             events may only schedule strictly future work",
            self.date
        );
        self.calendar
            .entry(date)
            .or_insert_with(|| DayEvents::new(date))
            .hook(event);
    }

    /// Registers every event on its date. This is the single choke point
    /// through which interventions, seeding, and contagion all inject
    /// future work; order within one date is preserved.
    pub fn register_events(&mut self, events: Vec<Event>) {
        for event in events {
            let date = event.date();
            self.register_event_on_day(event, date);
        }
    }

    /// Convenience wrapper for registering a single event.
    pub fn register_event(&mut self, event: Event) {
        self.register_events(vec![event]);
    }

    /// Whether everyone infected during the observation window has left the
    /// infected states. Used in simulations that compute R: once these
    /// people recover, the run can stop.
    #[must_use]
    pub fn first_people_are_done(&self) -> bool {
        if self.early_stop.is_none() {
            return false;
        }
        self.first_infectious_people
            .iter()
            .all(|id| !self.world.get_person_from_id(*id).is_infected())
    }

    /// The main loop of the simulation: advances day by day, then writes
    /// the output files. May be invoked once per instance.
    ///
    /// # Errors
    ///
    /// Fails on a repeated invocation, or if writing any output file fails.
    pub fn run_simulation(
        &mut self,
        num_days: u32,
        name: &str,
        datas_to_plot: &[DataToPlot],
        hooks: &mut [Box<dyn SimulationHook>],
    ) -> Result<(), EpidayError> {
        self.num_days_to_run
            .configure(num_days, "run_simulation")?;
        info!("Starting simulation {name}");

        for day in 0..num_days {
            for hook in hooks.iter_mut() {
                hook.start_of_day(self);
            }
            self.simulate_day();
            for hook in hooks.iter_mut() {
                hook.end_of_day(self);
            }
            if self.stats.is_static() || self.first_people_are_done() {
                if self.verbosity {
                    info!("simulation stopping after {day} days");
                }
                break;
            }
        }

        self.stats.mark_ending(self.world.all_people());
        let max_r_date = self.last_day_to_record_r;
        self.stats.calc_r0_data(self.world.all_people(), max_r_date);
        self.stats.dump("statistics.json")?;
        for data_to_plot in datas_to_plot {
            self.stats
                .plot_daily_sum(&data_to_plot.name, &data_to_plot.states)?;
        }
        self.stats.write_summary_file("summary", true)?;
        self.stats.write_summary_file("summary_long", false)?;
        if self.stats.has_r0_data() {
            self.stats.plot_r0_data(&format!("r0_data_{name}"))?;
        }
        self.stats.write_params(&self.params)?;
        self.stats.write_inputs(&SimulationInputs {
            initial_date: self.initial_date,
            num_days: self.num_days_to_run.value().copied(),
            population_size: self.world.population_size(),
            initial_infection_doc: self.initial_infection_doc.value().cloned(),
        })?;
        self.stats.write_interventions_inputs_csv()?;
        Ok(())
    }

    fn log_state_histogram(&self) {
        let mut state_counts: BTreeMap<DiseaseState, usize> = BTreeMap::new();
        for person in self.world.all_people() {
            *state_counts.entry(person.get_disease_state()).or_default() += 1;
        }
        info!("------ {}: disease state ------------", self.date);
        info!("{state_counts:?}");

        let mut by_environment: BTreeMap<EnvironmentKind, usize> = BTreeMap::new();
        for person in self.world.all_people() {
            if !person.is_infected() {
                continue;
            }
            if let Some(data) = person.get_infection_data() {
                if let crate::world::InfectionSource::Environment { id, .. } = data.source {
                    let kind = self.world.all_environments()[id.0].kind();
                    *by_environment.entry(kind).or_default() += 1;
                }
            }
        }
        info!("------ Infected by environments ----------");
        info!("{by_environment:?}");
    }
}
