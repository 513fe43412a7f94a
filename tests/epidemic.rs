//! End-to-end run over a generated world, through the public API only.

use epiday::{
    DataToPlot, DiseaseState, SimDate, Simulation, SimulationConfig, WorkplaceClosureIntervention,
    WorldBuilder,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn full_epidemic_run_writes_outputs() {
    let params = epiday::Params::default();
    let mut rng = StdRng::seed_from_u64(5);
    let world = WorldBuilder::new(&params, "integration-city").build(&mut rng);
    let population = world.population_size();

    let dir = tempfile::tempdir().unwrap();
    let mut simulation = Simulation::new(
        world,
        SimDate::new(0),
        params.clone(),
        SimulationConfig {
            interventions: vec![Box::new(WorkplaceClosureIntervention {
                start: SimDate::new(10),
                duration_days: 20,
            })],
            outdir: dir.path().to_path_buf(),
            seed: 5,
            ..SimulationConfig::default()
        },
    )
    .unwrap();

    simulation
        .infect_random_set(10, "integration seeding", 0.05, None, 18)
        .unwrap();

    simulation
        .run_simulation(
            60,
            "integration",
            &[DataToPlot {
                name: "infected".to_string(),
                states: vec![
                    DiseaseState::Latent,
                    DiseaseState::Asymptomatic,
                    DiseaseState::Symptomatic,
                    DiseaseState::Critical,
                ],
            }],
            &mut [],
        )
        .unwrap();

    // The run covered at most the requested days and recorded each of them.
    let days_recorded = simulation.stats().daily().len();
    assert!(days_recorded >= 1 && days_recorded <= 60);
    assert_eq!(
        simulation.current_date(),
        SimDate::new(days_recorded as u32)
    );

    // The ten seeds (plus any onward transmission) have left susceptibility,
    // and the immunized five percent are immune.
    let population_after = simulation.world().population_size();
    assert_eq!(population, population_after);
    let non_susceptible = simulation
        .world()
        .all_people()
        .iter()
        .filter(|p| !p.get_disease_state().is_susceptible())
        .count();
    assert!(non_susceptible >= 10 + (population as f64 * 0.05).round() as usize);

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

    // Provenance made it into the inputs file.
    let inputs = std::fs::read_to_string(dir.path().join("inputs.txt")).unwrap();
    assert!(inputs.contains("integration seeding"));
    assert!(inputs.contains(&format!("population size: {population}")));
}
