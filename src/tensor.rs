//! The flat tensor boundary of the operator: row-major `f32` buffers with explicit shapes.

use serde::{Deserialize, Serialize};

use crate::error::{MpmError, Result};
use crate::math::{Mat, T};
use crate::mpm::grid::MpmGrid;
use crate::mpm::particles::{write_matrices, MpmParticles};
use crate::mpm::MpmParameters;

/// An owned, row-major tensor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl Tensor {
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Tensor {
            shape,
            data: vec![0.; len],
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// The number of values a buffer of this shape holds.
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// The number of values per entry of the leading (batch) axis.
    pub fn instance_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// The values of entry `b` of the leading axis.
    pub fn instance(&self, b: usize) -> &[T] {
        let len = self.instance_len();
        &self.data[b * len..(b + 1) * len]
    }

    pub fn instance_mut(&mut self, b: usize) -> &mut [T] {
        let len = self.instance_len();
        &mut self.data[b * len..(b + 1) * len]
    }
}

/// The sizes every tensor of a step agrees on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StepShape {
    pub batch: usize,
    pub dim: usize,
    pub particles: usize,
    pub num_cells: usize,
}

/// The particle state of a batch of simulation instances.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MpmInputs {
    /// `(B, D, N)`
    pub position: Tensor,
    /// `(B, D, N)`
    pub velocity: Tensor,
    /// `(B, D, D, N)`
    pub affine: Tensor,
    /// `(B, D, D, N)`
    pub deformation: Tensor,
}

/// The result of a step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MpmOutputs {
    /// `(B, D, N)`
    pub position: Tensor,
    /// `(B, D, N)`
    pub velocity: Tensor,
    /// `(B, D, D, N)`
    pub affine: Tensor,
    /// `(B, D, D, N)`
    pub deformation: Tensor,
    /// `(B, D, D, N)`: the rotation of the polar decomposition of the input deformation gradient.
    pub poly: Tensor,
    /// `(B, num_cells, D + 1)`: node velocity, then node mass.
    pub grid: Tensor,
}

impl MpmInputs {
    /// Packs a batch of particle sets into tensors. Every instance must have the same number of
    /// particles.
    pub fn from_instances<const D: usize>(instances: &[MpmParticles<D>]) -> Result<Self> {
        let batch = instances.len();
        let n = instances.first().map_or(0, |p| p.len());

        if let Some(other) = instances.iter().find(|p| p.len() != n) {
            return Err(MpmError::ShapeMismatch {
                what: "particle count",
                name: "instances",
                shape: vec![batch, D, other.len()],
                expected: n,
            });
        }

        let mut inputs = MpmInputs {
            position: Tensor::zeros(vec![batch, D, n]),
            velocity: Tensor::zeros(vec![batch, D, n]),
            affine: Tensor::zeros(vec![batch, D, D, n]),
            deformation: Tensor::zeros(vec![batch, D, D, n]),
        };

        for (b, particles) in instances.iter().enumerate() {
            particles.write_slices(
                inputs.position.instance_mut(b),
                inputs.velocity.instance_mut(b),
                inputs.affine.instance_mut(b),
                inputs.deformation.instance_mut(b),
            );
        }

        Ok(inputs)
    }

    /// Unpacks instance `b`. Assumes the shapes have been checked.
    pub fn instance<const D: usize>(&self, b: usize) -> MpmParticles<D> {
        MpmParticles::from_slices(
            self.position.instance(b),
            self.velocity.instance(b),
            self.affine.instance(b),
            self.deformation.instance(b),
        )
    }

    fn named(&self) -> [(&'static str, &Tensor, usize); 4] {
        [
            ("position", &self.position, 3),
            ("velocity", &self.velocity, 3),
            ("affine", &self.affine, 4),
            ("deformation", &self.deformation, 4),
        ]
    }

    /// Checks that the tensors are compatible with each other and with `params`, before any
    /// numeric work is done.
    ///
    /// In order: the ranks, the batch axes, the spatial axes (against each other and against the
    /// length of `gravity` and `resolution`), the particle axes, and finally the buffer lengths.
    pub fn check_shapes(&self, params: &MpmParameters) -> Result<StepShape> {
        let named = self.named();

        for &(name, tensor, expected) in named.iter() {
            if tensor.rank() != expected {
                return Err(MpmError::Rank {
                    name,
                    expected,
                    actual: tensor.shape.clone(),
                });
            }
        }

        let batch = self.position.shape[0];
        let dim = self.position.shape[1];
        let particles = *self.position.shape.last().unwrap_or(&0);

        let mismatch = |what: &'static str, name: &'static str, tensor: &Tensor, expected| {
            MpmError::ShapeMismatch {
                what,
                name,
                shape: tensor.shape.clone(),
                expected,
            }
        };

        for &(name, tensor, _) in named.iter() {
            if tensor.shape[0] != batch {
                return Err(mismatch("batch size", name, tensor, batch));
            }
        }

        for &(name, tensor, rank) in named.iter() {
            if tensor.shape[1..rank - 1].iter().any(|&d| d != dim) {
                return Err(mismatch("spatial dimension", name, tensor, dim));
            }
        }
        params.check_dim(dim)?;
        if dim != 2 && dim != 3 {
            return Err(MpmError::UnsupportedDimension(dim));
        }

        for &(name, tensor, rank) in named.iter() {
            if tensor.shape[rank - 1] != particles {
                return Err(mismatch("particle count", name, tensor, particles));
            }
        }

        for &(name, tensor, _) in named.iter() {
            if tensor.data.len() != tensor.num_elements() {
                return Err(MpmError::BufferLength {
                    name,
                    expected: tensor.num_elements(),
                    actual: tensor.data.len(),
                });
            }
        }

        Ok(StepShape {
            batch,
            dim,
            particles,
            num_cells: params.num_cells(),
        })
    }
}

impl MpmOutputs {
    /// Zero-filled outputs for a step of the given shape.
    pub fn zeros(shape: &StepShape) -> Self {
        let StepShape {
            batch,
            dim,
            particles,
            num_cells,
        } = *shape;

        MpmOutputs {
            position: Tensor::zeros(vec![batch, dim, particles]),
            velocity: Tensor::zeros(vec![batch, dim, particles]),
            affine: Tensor::zeros(vec![batch, dim, dim, particles]),
            deformation: Tensor::zeros(vec![batch, dim, dim, particles]),
            poly: Tensor::zeros(vec![batch, dim, dim, particles]),
            grid: Tensor::zeros(vec![batch, num_cells, dim + 1]),
        }
    }

    /// Writes the updated particles, rotations, and grid of instance `b`.
    pub(crate) fn write_instance<const D: usize>(
        &mut self,
        b: usize,
        particles: &MpmParticles<D>,
        rotations: &[Mat<D>],
        grid: &MpmGrid<D>,
    ) {
        particles.write_slices(
            self.position.instance_mut(b),
            self.velocity.instance_mut(b),
            self.affine.instance_mut(b),
            self.deformation.instance_mut(b),
        );
        write_matrices(rotations, self.poly.instance_mut(b));
        grid.write_output(self.grid.instance_mut(b));
    }

    /// The updated particle state, to feed into the next step.
    pub fn into_inputs(self) -> MpmInputs {
        MpmInputs {
            position: self.position,
            velocity: self.velocity,
            affine: self.affine,
            deformation: self.deformation,
        }
    }
}
