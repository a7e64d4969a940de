use crate::math::{determinant, T, TV};
use crate::mpm::grid::MpmGrid;
use crate::mpm::particles::MpmParticles;
use itertools::izip;
use na::Vector3;

/// Conserved (or nearly conserved) quantities of a simulation state.
pub trait SimulationStatistics {
    fn total_mass(&self) -> T;
    /// Linear momentum, embedded in 3D.
    fn total_linear_momentum(&self) -> Vector3<T>;
    /// Angular momentum about the origin. For 2D states only the z component is nonzero.
    fn total_angular_momentum(&self) -> Vector3<T>;
    fn total_energy(&self) -> T;
    fn total_volume(&self) -> T;
}

/// The particles of one instance, along with the per-particle constants they need for statistics.
pub struct ParticleStatistics<'a, const D: usize> {
    pub particles: &'a MpmParticles<D>,
    pub particle_mass: T,
    pub particle_volume: T,
}

fn embed<const D: usize>(v: &TV<D>) -> Vector3<T> {
    Vector3::from_fn(|i, _| if i < D { v[i] } else { 0. })
}

impl<'a, const D: usize> SimulationStatistics for ParticleStatistics<'a, D> {
    fn total_mass(&self) -> T {
        self.particles.len() as T * self.particle_mass
    }

    fn total_linear_momentum(&self) -> Vector3<T> {
        embed(&self.particles.total_momentum(self.particle_mass))
    }

    fn total_angular_momentum(&self) -> Vector3<T> {
        izip!(&self.particles.position, &self.particles.velocity)
            .map(|(x, v)| self.particle_mass * embed(x).cross(&embed(v)))
            .sum()
    }

    /// Kinetic energy.
    fn total_energy(&self) -> T {
        self.particles
            .velocity
            .iter()
            .map(|v| 0.5 * self.particle_mass * v.dot(v))
            .sum()
    }

    fn total_volume(&self) -> T {
        self.particles
            .deformation_gradient
            .iter()
            .map(|f| determinant(f) * self.particle_volume)
            .sum()
    }
}

impl<const D: usize> SimulationStatistics for MpmGrid<D> {
    fn total_mass(&self) -> T {
        MpmGrid::total_mass(self)
    }

    fn total_linear_momentum(&self) -> Vector3<T> {
        embed(&self.total_momentum())
    }

    fn total_angular_momentum(&self) -> Vector3<T> {
        (0..self.data.num_cells)
            .map(|i| {
                let x = self.data.coord_to_pos(&self.data.index_to_coord(i));
                embed(&x).cross(&embed(&self.momentum[i]))
            })
            .sum()
    }

    fn total_energy(&self) -> T {
        izip!(&self.mass, &self.velocity)
            .map(|(&m, v)| 0.5 * m * v.dot(v))
            .sum()
    }

    /// Volume of the nodes that carry mass.
    fn total_volume(&self) -> T {
        let cell_volume = self.data.h.powi(D as i32);
        self.mass.iter().filter(|&&m| m > 0.).count() as T * cell_volume
    }
}
