use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info_span, trace};

use super::algo::{grid_to_particle, particle_to_grid};
use super::grid::MpmGrid;
use super::parameters::{MpmParameters, StepParameters};
use super::particles::MpmParticles;
use crate::error::{MpmError, Result};
use crate::math::Mat;
use crate::tensor::{MpmInputs, MpmOutputs, StepShape};

/// A configured MPM step. The parameters are validated once, when the operator is created, and
/// are then reused by every call to [`MpmOperator::step`].
#[derive(Debug, Clone)]
pub struct MpmOperator {
    params: MpmParameters,
}

impl MpmOperator {
    pub fn new(params: MpmParameters) -> Result<Self> {
        params.validate()?;
        Ok(MpmOperator { params })
    }

    pub fn params(&self) -> &MpmParameters {
        &self.params
    }

    /// Advances every instance of the batch by one time step.
    ///
    /// All shape checks happen before any numeric work; on error, nothing is computed.
    pub fn step(&self, inputs: &MpmInputs) -> Result<MpmOutputs> {
        let shape = inputs.check_shapes(&self.params)?;

        let span = info_span!(
            "mpm_step",
            batch = shape.batch,
            dim = shape.dim,
            particles = shape.particles
        );
        let _enter = span.enter();

        match shape.dim {
            2 => step_batch::<2>(&self.params, inputs, &shape),
            3 => step_batch::<3>(&self.params, inputs, &shape),
            d => Err(MpmError::UnsupportedDimension(d)),
        }
    }
}

/// Validates `params` and advances every instance of the batch by one time step.
pub fn step(params: &MpmParameters, inputs: &MpmInputs) -> Result<MpmOutputs> {
    MpmOperator::new(params.clone())?.step(inputs)
}

/// The state of one instance at the end of a step.
struct InstanceStep<const D: usize> {
    particles: MpmParticles<D>,
    rotations: Vec<Mat<D>>,
    grid: MpmGrid<D>,
}

fn step_batch<const D: usize>(
    params: &MpmParameters,
    inputs: &MpmInputs,
    shape: &StepShape,
) -> Result<MpmOutputs> {
    let params = params.resolve::<D>()?;

    let instances = (0..shape.batch)
        .into_par_iter()
        .map(|b| step_instance(b, inputs.instance::<D>(b), &params))
        .collect::<Vec<_>>();

    let mut outputs = MpmOutputs::zeros(shape);
    for (b, instance) in instances.iter().enumerate() {
        outputs.write_instance(b, &instance.particles, &instance.rotations, &instance.grid);
    }

    Ok(outputs)
}

fn step_instance<const D: usize>(
    b: usize,
    mut particles: MpmParticles<D>,
    params: &StepParameters<D>,
) -> InstanceStep<D> {
    let start = Instant::now();
    let mut transfer = particle_to_grid(&particles, params);
    trace!(instance = b, elapsed = ?start.elapsed(), "particle to grid");

    transfer.grid.velocity_update(
        params.dt,
        &params.gravity,
        params.boundary,
        params.boundary_layer,
    );
    debug!(
        instance = b,
        grid_mass = transfer.grid.total_mass(),
        grid_momentum = ?transfer.grid.total_momentum(),
        "grid updated"
    );

    let start = Instant::now();
    grid_to_particle(&mut particles, &transfer.grid, &transfer.stencils, params.dt);
    trace!(instance = b, elapsed = ?start.elapsed(), "grid to particle");

    InstanceStep {
        particles,
        rotations: transfer.rotations,
        grid: transfer.grid,
    }
}
