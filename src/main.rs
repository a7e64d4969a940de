use std::path::{Path, PathBuf};

use eyre::WrapErr;
use structopt::StructOpt;
use tracing::{info, Level};

use mpm_step::initial_condition::{Block, InitialCondition};
use mpm_step::math::{T, TV};
use mpm_step::mpm::MpmParticles;
use mpm_step::statistics::{ParticleStatistics, SimulationStatistics};
use mpm_step::util::RangeExt;
use mpm_step::{MpmInputs, MpmOperator, MpmParameters};

#[derive(StructOpt, Debug)]
#[structopt(name = "mpm_step")]
struct Opt {
    /// JSON file with the step parameters. Defaults are used for anything left out.
    #[structopt(short, long)]
    config: Option<PathBuf>,
    /// JSON file with the initial particle tensors. Without it, every instance starts as a block
    /// of particles in the middle of the domain.
    #[structopt(short, long)]
    scene: Option<PathBuf>,
    #[structopt(short = "n", long, default_value = "100")]
    steps: usize,
    /// Number of instances in the generated scene.
    #[structopt(short, long, default_value = "1")]
    batch: usize,
    /// Where to write one MessagePack file of outputs per step.
    #[structopt(short, long)]
    output_dir: Option<PathBuf>,
    /// -v for info, -vv for debug, -vvv for trace.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

fn read_json<V: serde::de::DeserializeOwned>(path: &Path, what: &str) -> eyre::Result<V> {
    std::fs::read(path)
        .wrap_err_with(|| format!("Failed to read {} file: {:?}", what, path))
        .and_then(|json| {
            serde_json::from_slice(&json)
                .wrap_err_with(|| format!("Serde failed to deserialize {} JSON.", what))
        })
}

/// A block filling the middle half of the domain, for every instance.
fn default_scene<const D: usize>(params: &MpmParameters, batch: usize) -> eyre::Result<MpmInputs> {
    let upper = TV::<D>::from_fn(|d, _| (params.resolution[d] - 1) as T * params.dx);
    let domain = TV::<D>::zeros()..upper;
    let center = domain.center();
    let quarter = domain.size() / 4.;

    let block = Block {
        size: center - quarter..center + quarter,
        spacing: params.dx,
        jitter: params.dx / 8.,
        velocity: TV::zeros(),
    };

    let mut particles = MpmParticles::<D>::default();
    block.add_particles(&mut particles);

    Ok(MpmInputs::from_instances(&vec![particles; batch])?)
}

fn log_statistics<const D: usize>(step: usize, params: &MpmParameters, inputs: &MpmInputs) {
    let batch = inputs.position.shape[0];
    for b in 0..batch {
        let particles = inputs.instance::<D>(b);
        let stats = ParticleStatistics {
            particles: &particles,
            particle_mass: params.particle_mass,
            particle_volume: params.particle_volume,
        };

        info!(
            step,
            instance = b,
            mass = stats.total_mass(),
            momentum = ?stats.total_linear_momentum(),
            angular_momentum = ?stats.total_angular_momentum(),
            kinetic_energy = stats.total_energy(),
            volume = stats.total_volume(),
            "statistics"
        );
    }
}

fn main() -> eyre::Result<()> {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let params: MpmParameters = match &opt.config {
        Some(path) => read_json(path, "parameter")?,
        None => MpmParameters::default(),
    };
    let operator = MpmOperator::new(params.clone()).wrap_err("Invalid parameters.")?;

    let mut inputs: MpmInputs = match &opt.scene {
        Some(path) => read_json(path, "scene")?,
        None => match params.dim() {
            2 => default_scene::<2>(&params, opt.batch)?,
            _ => default_scene::<3>(&params, opt.batch)?,
        },
    };

    if let Some(path) = &opt.output_dir {
        std::fs::create_dir_all(path)
            .wrap_err_with(|| format!("Failed to create output directory: {:?}", path))?;
    }

    for step in 0..opt.steps {
        let outputs = operator
            .step(&inputs)
            .wrap_err_with(|| format!("Step {} failed.", step))?;

        if let Some(path) = &opt.output_dir {
            let mut path = path.clone();
            path.push(format!("{:04}.dat", step));
            let mut writer = std::fs::File::create(&path)?;
            rmp_serde::encode::write(&mut writer, &outputs)?;
        }

        inputs = outputs.into_inputs();
        match params.dim() {
            2 => log_statistics::<2>(step, &params, &inputs),
            _ => log_statistics::<3>(step, &params, &inputs),
        }
    }

    Ok(())
}
