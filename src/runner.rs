use std::path::Path;

use crate::error::EpidayError;
use crate::log::{set_log_level, LevelFilter};
use crate::parameters::Params;
use crate::simulation::Simulation;
use crate::stats::DataToPlot;
use crate::disease::DiseaseState;
use clap::Parser;

/// Default cli arguments for the epiday runner
#[derive(Parser, Debug)]
#[command(name = "epiday")]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path for a parameters config file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Path for statistics output
    #[arg(short, long, default_value = "outputs")]
    pub output_dir: String,

    /// Number of days to simulate
    #[arg(short, long, default_value = "150")]
    pub num_days: u32,

    /// Simulation name, used in output filenames
    #[arg(long, default_value = "simulation")]
    pub name: String,

    /// Enable info-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// The state series written for every run.
fn default_datas_to_plot() -> Vec<DataToPlot> {
    vec![
        DataToPlot {
            name: "infected".to_string(),
            states: vec![
                DiseaseState::Latent,
                DiseaseState::Asymptomatic,
                DiseaseState::Symptomatic,
                DiseaseState::Critical,
            ],
        },
        DataToPlot {
            name: "deceased".to_string(),
            states: vec![DiseaseState::Deceased],
        },
    ]
}

/// Runs a simulation with cli arguments.
///
/// Parses the command line, loads parameters (falling back to the baseline
/// defaults when no config is given), hands both to `setup_fn` to build the
/// simulation — world construction and seeding belong to the caller — and
/// then runs it for the requested number of days.
///
/// # Errors
///
/// Returns an error if argument parsing, parameter loading, the setup
/// function, or the run fails.
pub fn run_with_args<F>(setup_fn: F) -> Result<Simulation, Box<dyn std::error::Error>>
where
    F: Fn(&BaseArgs, &Params) -> Result<Simulation, EpidayError>,
{
    let args = BaseArgs::parse();
    run_with_args_internal(args, setup_fn)
}

fn run_with_args_internal<F>(
    args: BaseArgs,
    setup_fn: F,
) -> Result<Simulation, Box<dyn std::error::Error>>
where
    F: Fn(&BaseArgs, &Params) -> Result<Simulation, EpidayError>,
{
    if args.verbose {
        set_log_level(LevelFilter::Info);
    }

    let params = if args.config.is_empty() {
        Params::default()
    } else {
        println!("Loading parameters from: {}", args.config);
        Params::load_from_file(Path::new(&args.config))?
    };

    let mut simulation = setup_fn(&args, &params)?;
    simulation.run_simulation(args.num_days, &args.name, &default_datas_to_plot(), &mut [])?;
    Ok(simulation)
}

#[cfg(test)]
mod tests {
    use super::{run_with_args_internal, BaseArgs};
    use crate::date::SimDate;
    use crate::simulation::{Simulation, SimulationConfig};
    use crate::world::World;

    fn test_args(output_dir: &str) -> BaseArgs {
        BaseArgs {
            random_seed: 42,
            config: String::new(),
            output_dir: output_dir.to_string(),
            num_days: 3,
            name: "test".to_string(),
            verbose: false,
        }
    }

    #[test]
    fn test_run_with_args() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_with_args_internal(test_args(dir.path().to_str().unwrap()), |args, params| {
            let mut world = World::new();
            world.add_person(30, "testville", &[], 0.5);
            Simulation::new(
                world,
                SimDate::new(0),
                params.clone(),
                SimulationConfig {
                    seed: args.random_seed,
                    outdir: args.output_dir.clone().into(),
                    ..SimulationConfig::default()
                },
            )
        });
        assert!(result.is_ok());
        // The run wrote its artifacts into the requested directory.
        assert!(dir.path().join("summary.txt").exists());
        assert!(dir.path().join("daily_sum_infected.csv").exists());
    }

    #[test]
    fn test_run_with_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("params.json");
        std::fs::write(
            &config_path,
            r#"{"population": {"num_households": 7}}"#,
        )
        .unwrap();

        let mut args = test_args(dir.path().to_str().unwrap());
        args.config = config_path.to_str().unwrap().to_string();

        let result = run_with_args_internal(args, |args, params| {
            assert_eq!(params.population.num_households, 7);
            Simulation::new(
                World::new(),
                SimDate::new(0),
                params.clone(),
                SimulationConfig {
                    seed: args.random_seed,
                    outdir: args.output_dir.clone().into(),
                    ..SimulationConfig::default()
                },
            )
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_setup_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_with_args_internal(test_args(dir.path().to_str().unwrap()), |_, _| {
            Err(crate::error::EpidayError::EpidayError(
                "no world available".to_string(),
            ))
        });
        assert!(result.is_err());
    }
}
