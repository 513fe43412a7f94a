//! A day-stepped agent-based simulation engine for epidemic modeling
//!
//! Epiday models the day-by-day spread of an infectious disease through a
//! synthetic population organized into households and shared environments
//! (workplaces, schools, the city community), under configurable
//! public-health interventions.
//!
//! The central object is the [`Simulation`], which owns a [`World`] and a
//! date-keyed event calendar and advances one day at a time:
//! * applying the events registered for the current date (disease
//!   progression, intervention activation)
//! * re-registering people whose routines changed into their environments
//! * propagating infection through every environment
//! * recording the day's changes with the [`Statistics`] sink
//!
//! A run starts from exactly one seeding protocol (see the `seeding`
//! module), iterates for a bounded number of days, and ends early once the
//! epidemic saturates or — when an [`EarlyStop`] window is configured — once
//! everyone infected inside the window has resolved.

pub mod date;
pub mod disease;
pub mod error;
pub mod event;
pub mod interventions;
pub mod log;
pub mod parameters;
pub mod runner;
pub mod seeding;
pub mod simulation;
pub mod stats;
pub mod world;

pub use crate::date::SimDate;
pub use crate::disease::{sample_seir_times, DiseaseState, SeirStage};
pub use crate::error::EpidayError;
pub use crate::event::{DayEvents, Event};
pub use crate::interventions::{
    ElderlyQuarantineIntervention, Intervention, SocialDistancingIntervention,
    WorkplaceClosureIntervention,
};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::parameters::Params;
pub use crate::runner::{run_with_args, BaseArgs};
pub use crate::seeding::{ChosenInfection, InitialImmuneSource, InitialInfectionParams};
pub use crate::simulation::{
    EarlyStop, EarlyStopKind, Simulation, SimulationConfig, SimulationHook,
};
pub use crate::stats::{DataToPlot, DayStats, SimulationInputs, Statistics};
pub use crate::world::{
    Environment, EnvironmentId, EnvironmentKind, InfectionData, InfectionSource, Person, PersonId,
    World, WorldBuilder,
};
