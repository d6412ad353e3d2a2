//! `sim_cli`: parses the configuration surface documented for the dispatch
//! kernel, assembles a scenario from a map file and a resource trace, runs
//! it to completion, and prints a configuration echo plus the final report.

use std::path::PathBuf;
use std::process::ExitCode;

use bevy_ecs::prelude::World;
use clap::Parser;

use sim_core::loaders::map_json::JsonMapSource;
use sim_core::loaders::trace_csv::CsvTraceSource;
use sim_core::loaders::BoundingPolygon;
use sim_core::runner::{initialize_simulation, run_until_empty};
use sim_core::scenario::{build_scenario, ScenarioParams};
use sim_core::telemetry::Statistics;

/// A fixed safety valve against a runaway/non-terminating scenario; not part
/// of the documented configuration surface.
const MAX_STEPS: u64 = 10_000_000;

#[derive(Parser)]
#[command(
    name = "sim_cli",
    about = "Discrete-event ride-hailing dispatch simulator"
)]
struct Cli {
    /// OpenStreetMap-style JSON road-network file.
    #[arg(long)]
    map_file: PathBuf,

    /// Taxi-trip CSV resource trace.
    #[arg(long)]
    resource_file: PathBuf,

    /// KML-stand-in flat-file bounding polygon that clips the map to a
    /// geographic region (one `lat,lon` vertex per line).
    #[arg(long)]
    bounding_polygon_file: Option<PathBuf>,

    /// Number of agents to place on the map at setup.
    #[arg(long)]
    total_agents: u32,

    /// Seconds a resource may wait before it expires unmatched.
    #[arg(long)]
    resource_maximum_life_time: u64,

    /// Seed for random initial agent placement (and the default search policy).
    #[arg(long)]
    agent_placement_seed: u64,

    /// Scales every road's travel time by `1.0 / speed_reduction`; must be in (0.0, 1.0].
    #[arg(long, default_value_t = 1.0)]
    speed_reduction: f64,

    /// Offset, in seconds, of the first pool window's start from simulation
    /// start (the pool batcher's second enumerated configuration knob).
    #[arg(long, default_value_t = 0)]
    pool_initial_offset: u64,
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(cli.speed_reduction > 0.0 && cli.speed_reduction <= 1.0) {
        return Err(format!(
            "speed_reduction must be in (0.0, 1.0], got {}",
            cli.speed_reduction
        )
        .into());
    }

    let polygon = cli
        .bounding_polygon_file
        .as_deref()
        .map(BoundingPolygon::from_flat_file)
        .transpose()?;

    let loaded = JsonMapSource::load_file_with_options(
        &cli.map_file,
        cli.speed_reduction,
        polygon.as_ref(),
    )?;
    let resources = CsvTraceSource::load_file(&cli.resource_file, &loaded.map)?;

    println!("Configuration:");
    println!("  map_file:                  {}", cli.map_file.display());
    println!("  resource_file:             {}", cli.resource_file.display());
    println!(
        "  bounding_polygon_file:     {}",
        cli.bounding_polygon_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    println!("  total_agents:              {}", cli.total_agents);
    println!(
        "  resource_maximum_life_time: {}s",
        cli.resource_maximum_life_time
    );
    println!("  agent_placement_seed:      {}", cli.agent_placement_seed);
    println!("  speed_reduction:           {}", cli.speed_reduction);
    println!("  pool_initial_offset:       {}s", cli.pool_initial_offset);
    println!("  intersections loaded:      {}", loaded.map.intersections().len());
    println!("  roads loaded:              {}", loaded.map.roads().len());
    println!("  hubs loaded:               {}", loaded.hubs.len());
    println!("  resources loaded:          {}", resources.len());

    let params = ScenarioParams::default()
        .with_seed(cli.agent_placement_seed)
        .with_total_agents(cli.total_agents)
        .with_resource_maximum_life_time(cli.resource_maximum_life_time)
        .with_pool_initial_offset(cli.pool_initial_offset);

    let mut world = World::new();
    build_scenario(&mut world, loaded.map, loaded.hubs, resources, params)?;
    initialize_simulation(&mut world);

    let steps = run_until_empty(&mut world, MAX_STEPS)
        .map_err(|e| format!("simulation invariant violated: {e}"))?;

    let report = world.resource::<Statistics>().report();
    println!("\nSteps executed: {steps}");
    println!("\n{report}");

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("setup failed: {err}");
            ExitCode::FAILURE
        }
    }
}
