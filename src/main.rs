use std::path::PathBuf;

use epiday::{
    error, info, run_with_args, InitialImmuneSource, InitialInfectionParams, SimDate, Simulation,
    SimulationConfig, SocialDistancingIntervention, WorldBuilder,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() {
    let result = run_with_args(|args, params| {
        let mut rng = StdRng::seed_from_u64(args.random_seed);
        let world = WorldBuilder::new(params, "demo-city").build(&mut rng);

        let mut simulation = Simulation::new(
            world,
            SimDate::new(0),
            params.clone(),
            SimulationConfig {
                interventions: vec![Box::new(SocialDistancingIntervention {
                    start: SimDate::new(30),
                    duration_days: 45,
                    compliance: 0.7,
                    workplace_factor: 0.3,
                    community_factor: 0.5,
                })],
                verbosity: args.verbose,
                outdir: PathBuf::from(&args.output_dir),
                seed: args.random_seed,
                ..SimulationConfig::default()
            },
        )?;

        InitialInfectionParams {
            num_to_infect: 20,
            per_to_immune: 0.0,
            city_name: None,
            immune_source: InitialImmuneSource::GeneralPopulation,
            min_age: 0,
        }
        .apply(&mut simulation)?;

        Ok(simulation)
    });

    match result {
        Ok(_) => {
            info!("Simulation finished executing");
        }
        Err(e) => {
            error!("Simulation exited with error: {e}");
        }
    }
}
