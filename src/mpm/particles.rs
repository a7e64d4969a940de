use crate::math::{determinant, Mat, T, TV};

/// Contains all of the particle data of one instance: position, velocity, affine matrix, and
/// deformation gradient.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MpmParticles<const D: usize> {
    pub position: Vec<TV<D>>,
    pub velocity: Vec<TV<D>>,
    /// The APIC affine velocity matrices `C_p`.
    pub affine_matrix: Vec<Mat<D>>,
    pub deformation_gradient: Vec<Mat<D>>,
}

impl<const D: usize> MpmParticles<D> {
    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    /// Adds a new undeformed particle at the given position, with a zero affine matrix.
    pub fn add_particle(&mut self, position: TV<D>, velocity: TV<D>) {
        self.position.push(position);
        self.velocity.push(velocity);
        self.affine_matrix.push(Mat::zeros());
        self.deformation_gradient.push(Mat::identity());
    }

    /// Reads the particles of one instance out of the flattened `(D, N)` vector and `(D, D, N)`
    /// matrix layouts.
    pub fn from_slices(position: &[T], velocity: &[T], affine: &[T], deformation: &[T]) -> Self {
        let n = position.len() / D;

        MpmParticles {
            position: read_vectors(position, n),
            velocity: read_vectors(velocity, n),
            affine_matrix: read_matrices(affine, n),
            deformation_gradient: read_matrices(deformation, n),
        }
    }

    /// Writes the particles back into the flattened layouts used by [`Self::from_slices`].
    pub fn write_slices(
        &self,
        position: &mut [T],
        velocity: &mut [T],
        affine: &mut [T],
        deformation: &mut [T],
    ) {
        write_vectors(&self.position, position);
        write_vectors(&self.velocity, velocity);
        write_matrices(&self.affine_matrix, affine);
        write_matrices(&self.deformation_gradient, deformation);
    }

    pub fn total_momentum(&self, particle_mass: T) -> TV<D> {
        self.velocity.iter().sum::<TV<D>>() * particle_mass
    }

    /// The current volume `J V_p` of every particle, summed.
    pub fn total_volume(&self, particle_volume: T) -> T {
        self.deformation_gradient
            .iter()
            .map(|f| determinant(f) * particle_volume)
            .sum()
    }
}

/// Component `d` of vector `p` lives at `d * n + p`.
pub(crate) fn read_vectors<const D: usize>(data: &[T], n: usize) -> Vec<TV<D>> {
    (0..n)
        .map(|p| TV::<D>::from_fn(|d, _| data[d * n + p]))
        .collect()
}

pub(crate) fn write_vectors<const D: usize>(vectors: &[TV<D>], out: &mut [T]) {
    let n = vectors.len();
    for (p, v) in vectors.iter().enumerate() {
        for d in 0..D {
            out[d * n + p] = v[d];
        }
    }
}

/// Entry `(r, c)` of matrix `p` lives at `(r * D + c) * n + p`.
pub(crate) fn read_matrices<const D: usize>(data: &[T], n: usize) -> Vec<Mat<D>> {
    (0..n)
        .map(|p| Mat::<D>::from_fn(|r, c| data[(r * D + c) * n + p]))
        .collect()
}

pub(crate) fn write_matrices<const D: usize>(matrices: &[Mat<D>], out: &mut [T]) {
    let n = matrices.len();
    for (p, m) in matrices.iter().enumerate() {
        for r in 0..D {
            for c in 0..D {
                out[(r * D + c) * n + p] = m[(r, c)];
            }
        }
    }
}
