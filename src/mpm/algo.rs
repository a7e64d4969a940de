use rayon::prelude::*;

use super::grid::binning::ParticleBins;
use super::grid::particle_grid_weights::Stencil;
use super::grid::MpmGrid;
use super::models::{ConstitutiveModel, PolarDecomposition};
use super::parameters::StepParameters;
use super::particles::MpmParticles;
use crate::math::{outer, Mat, T, TV};

/// What a particle transfers to every node of its stencil, computed once per particle.
#[derive(Debug, Clone)]
struct Contribution<const D: usize> {
    /// `m_p v_p`
    momentum: TV<D>,
    /// `m_p C_p`, applied to `x_i - x_p`.
    affine_momentum: Mat<D>,
    /// `-dt V_p tau_p`, applied to the weight gradient.
    stress_impulse: Mat<D>,
}

/// The result of the particle to grid transfer.
#[derive(Debug, Clone)]
pub struct Transfer<const D: usize> {
    pub grid: MpmGrid<D>,
    /// The stencil of every particle, reused by [`grid_to_particle`].
    pub stencils: Vec<Stencil<D>>,
    /// The rotational part of every particle's deformation gradient.
    pub rotations: Vec<Mat<D>>,
}

/// Transfers mass and momentum (including the APIC affine term and the elastic stress impulse)
/// from the particles to a fresh grid.
///
/// The reduction is a gather: particles are binned by the node their stencil starts at, and each
/// node visits the bins that can reach it in a fixed order. The result doesn't depend on how the
/// work is scheduled.
pub fn particle_to_grid<const D: usize>(
    particles: &MpmParticles<D>,
    params: &StepParameters<D>,
) -> Transfer<D> {
    let mut grid = MpmGrid::new(params.dx, params.resolution);
    let data = &grid.data;
    let (m, dt, volume) = (params.particle_mass, params.dt, params.particle_volume);

    let per_particle: Vec<(Stencil<D>, Contribution<D>, Mat<D>)> = particles
        .position
        .par_iter()
        .zip(particles.velocity.par_iter())
        .zip(particles.affine_matrix.par_iter())
        .zip(particles.deformation_gradient.par_iter())
        .map(|(((x, v), c), f)| {
            let stencil = data.stencil(x);
            let polar = PolarDecomposition::new(f);
            let tau = params.model.kirchhoff_stress(f, &polar);

            let contribution = Contribution {
                momentum: v * m,
                affine_momentum: c * m,
                stress_impulse: tau * (-dt * volume),
            };
            (stencil, contribution, polar.rotation)
        })
        .collect();

    let keys = per_particle
        .iter()
        .map(|(stencil, _, _)| data.coord_to_index(&stencil.base))
        .collect::<Vec<_>>();
    let bins = ParticleBins::new(&keys, data.num_cells);

    grid.mass
        .par_iter_mut()
        .zip(grid.momentum.par_iter_mut())
        .enumerate()
        .for_each(|(i, (node_mass, node_momentum))| {
            let coord = data.index_to_coord(i);

            for k in 0..Stencil::<D>::len() {
                let offset = Stencil::<D>::offset(k);
                if (0..D).any(|d| coord[d] < offset[d]) {
                    continue;
                }
                let base = data.coord_to_index(&(coord - offset));

                for &p in bins.particles(base) {
                    let (stencil, contribution, _) = &per_particle[p];
                    let w = stencil.weight(&offset);
                    let dpos = stencil.dpos(data, &offset);

                    *node_mass += w * m;
                    *node_momentum += (contribution.momentum
                        + contribution.affine_momentum * dpos)
                        * w
                        + contribution.stress_impulse * stencil.weight_grad(&offset);
                }
            }
        });

    let (stencils, rotations) = per_particle
        .into_iter()
        .map(|(stencil, _, rotation)| (stencil, rotation))
        .unzip();

    Transfer {
        grid,
        stencils,
        rotations,
    }
}

/// Interpolates the updated grid velocities back to the particles, then advects the particles
/// and updates their affine matrices and deformation gradients.
///
/// Advection never carries a particle out of the span of the grid nodes,
/// `[0, (resolution - 1) dx]`. A particle already past that span is not pulled back in, it only
/// can't move any further out.
pub fn grid_to_particle<const D: usize>(
    particles: &mut MpmParticles<D>,
    grid: &MpmGrid<D>,
    stencils: &[Stencil<D>],
    dt: T,
) {
    let data = &grid.data;
    let apic_scale = 4. * data.one_over_h * data.one_over_h;
    let upper = data.upper_bound();

    particles
        .position
        .par_iter_mut()
        .zip(particles.velocity.par_iter_mut())
        .zip(particles.affine_matrix.par_iter_mut())
        .zip(particles.deformation_gradient.par_iter_mut())
        .zip(stencils.par_iter())
        .for_each(|((((x, v), c), f), stencil)| {
            let mut velocity = TV::<D>::zeros();
            let mut b = Mat::<D>::zeros();

            for node in stencil.nodes(data) {
                let v_i = &grid.velocity[node.index];
                velocity += v_i * node.weight;
                b += outer(v_i, &node.dpos) * node.weight;
            }

            let affine = b * apic_scale;
            let moved = *x + velocity * dt;

            *x = TV::<D>::from_fn(|d, _| moved[d].max(x[d].min(0.)).min(x[d].max(upper[d])));
            *v = velocity;
            *f = (Mat::<D>::identity() + affine * dt) * *f;
            *c = affine;
        });
}
