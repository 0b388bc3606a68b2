use clap::Parser;
use log::{error, info};
use magnetic_fields::visualisation::{save_field_csv, save_potential_csv, save_statistics_csv};
use magnetic_fields::{
    ExtendedMagnet, MeasurementCoil, Point, Result, Rope, SceneConfig, Simulation, Solenoid, Source,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::process::ExitCode;

/// Quasi-static magnetic field simulation
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON scene file; a demo scene is used when omitted
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Resume from a checkpoint instead of building the scene
    #[arg(long, conflicts_with = "scene")]
    resume: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(long)]
    steps: Option<usize>,

    /// Frame time step in seconds
    #[arg(long)]
    dt: Option<f64>,

    /// Grid points per side for field export
    #[arg(short, long)]
    resolution: Option<usize>,

    /// Random initial rope displacement amplitude (m)
    #[arg(long, default_value_t = 0.0)]
    rope_noise: f64,

    /// Seed for the rope perturbation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Save a checkpoint every N steps
    #[arg(long)]
    checkpoint_every: Option<usize>,

    #[arg(long, default_value = "field.csv")]
    field_out: PathBuf,

    #[arg(long, default_value = "potential.csv")]
    potential_out: PathBuf,

    #[arg(long, default_value = "stats.csv")]
    stats_out: PathBuf,

    /// Write the final state here
    #[arg(long)]
    checkpoint_out: Option<PathBuf>,
}

// MARK: Demo scene
fn demo_scene() -> SceneConfig {
    SceneConfig {
        sources: vec![
            Source::Solenoid(Solenoid::default()),
            Source::Magnet(ExtendedMagnet::new(Point::new(0.12, -0.05), 0.1, 90.0)),
            Source::MeasurementCoil(MeasurementCoil::new(Point::new(0.0, 0.16), 0.03, 0.05, 50.0, 10.0)),
            Source::Rope(Rope::new(Point::new(0.0, 0.25), 0.3, 100.0, 1e-3)),
        ],
        ..SceneConfig::default()
    }
}

fn perturb_ropes(sim: &mut Simulation, amplitude: f64, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let ids: Vec<_> = sim.sources().iter().map(|e| e.id).collect();
    for id in ids {
        if let Some(Source::Rope(rope)) = sim.source_mut(id) {
            let profile: Vec<f64> = (0..rope.node_count())
                .map(|_| amplitude * (rng.random::<f64>() * 2.0 - 1.0))
                .collect();
            rope.set_displacement(&profile)?;
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let mut scene = match &args.scene {
        Some(path) => SceneConfig::from_file(path)?,
        None => demo_scene(),
    };
    if let Some(steps) = args.steps {
        scene.steps = steps;
    }
    if let Some(dt) = args.dt {
        scene.dt = dt;
    }
    if let Some(resolution) = args.resolution {
        scene.grid.resolution = resolution;
    }

    let mut sim = match &args.resume {
        Some(path) => Simulation::load_checkpoint(path)?,
        None => Simulation::from_scene(&scene),
    };
    info!("{} sources, t = {} s", sim.sources().len(), sim.time);

    if args.rope_noise > 0.0 {
        perturb_ropes(&mut sim, args.rope_noise, args.seed)?;
    }

    sim.run(scene.steps, scene.dt, args.checkpoint_every);

    // Grid queries are pure; bring rope dipoles in line with the final field first
    sim.align_ropes();
    info!("Saving field grid to {}...", args.field_out.display());
    save_field_csv(&sim, &scene.grid, &args.field_out)?;
    save_potential_csv(&sim, &scene.grid, &args.potential_out)?;
    save_statistics_csv(&sim.stats, &args.stats_out)?;

    if let Some(path) = &args.checkpoint_out {
        sim.save_checkpoint(path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Quasi-static Magnetic Field Simulation");

    match run(Args::parse()) {
        Ok(()) => {
            info!("Simulation complete!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
