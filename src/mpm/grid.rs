pub mod binning;
pub mod data;
pub mod particle_grid_weights;

pub use data::GridData;

use rayon::prelude::*;

use super::parameters::BoundaryCondition;
use crate::math::{T, TV, UV};

/// Nodes with less mass than this are treated as empty.
pub const MASS_EPSILON: T = 1e-10;

/// Stores the grid data for the Mpm Simulation
#[derive(Debug, Clone)]
pub struct MpmGrid<const D: usize> {
    pub mass: Vec<T>,
    pub momentum: Vec<TV<D>>,
    pub velocity: Vec<TV<D>>,
    pub data: GridData<D>,
}

impl<const D: usize> MpmGrid<D> {
    /// Creates an empty grid with `size` nodes per axis and spacing `h`.
    pub fn new(h: T, size: UV<D>) -> Self {
        let data = GridData::new(h, size);

        Self {
            mass: vec![0.; data.num_cells],
            momentum: vec![TV::zeros(); data.num_cells],
            velocity: vec![TV::zeros(); data.num_cells],
            data,
        }
    }

    pub fn total_mass(&self) -> T {
        self.mass.iter().sum()
    }

    pub fn total_momentum(&self) -> TV<D> {
        self.momentum.iter().sum()
    }

    /// Computes the node velocities from the transferred momentum, adds gravity, and applies the
    /// boundary condition. Nodes without mass get a zero velocity.
    pub fn velocity_update(
        &mut self,
        dt: T,
        gravity: &TV<D>,
        boundary: BoundaryCondition,
        boundary_layer: usize,
    ) {
        let data = &self.data;
        let mass = &self.mass;
        let momentum = &self.momentum;

        self.velocity
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, velocity)| {
                if mass[i] <= MASS_EPSILON {
                    *velocity = TV::zeros();
                    return;
                }

                *velocity = momentum[i] / mass[i] + gravity * dt;

                let coord = data.index_to_coord(i);
                boundary.apply(velocity, &coord, &data.size, boundary_layer);
            });
    }

    /// Writes the grid into a `num_cells * (D + 1)` buffer: for every node (in row-major order),
    /// its `D` velocity components followed by its mass.
    pub fn write_output(&self, out: &mut [T]) {
        debug_assert_eq!(out.len(), self.data.num_cells * (D + 1));

        out.par_chunks_mut(D + 1)
            .zip(self.velocity.par_iter().zip(self.mass.par_iter()))
            .for_each(|(node, (v, &m))| {
                node[..D].copy_from_slice(v.as_slice());
                node[D] = m;
            });
    }
}
