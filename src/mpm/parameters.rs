use serde::{Deserialize, Serialize};

use super::models::FixedCorotated;
use crate::error::{MpmError, Result};
use crate::math::{T, TV, UV};

/// The attributes of the MPM operator. These are fixed for the lifetime of an [`MpmOperator`]
/// and constant for every particle and grid node within a step.
///
/// The serialized names (and the defaults) follow the attribute names of the operator:
/// `dt`, `dx`, `E`, `nu`, `m_p`, `V_p`, `gravity`, `resolution`.
///
/// [`MpmOperator`]: super::MpmOperator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpmParameters {
    /// The size of the time step.
    pub dt: T,
    /// The grid spacing. Node `i` along an axis sits at `i * dx`.
    pub dx: T,
    #[serde(rename = "E", alias = "youngs_modulus")]
    pub youngs_modulus: T,
    #[serde(rename = "nu", alias = "poissons_ratio")]
    pub poissons_ratio: T,
    /// Mass of every particle.
    #[serde(rename = "m_p", alias = "particle_mass")]
    pub particle_mass: T,
    /// Initial (undeformed) volume of every particle.
    #[serde(rename = "V_p", alias = "particle_volume")]
    pub particle_volume: T,
    /// Acceleration applied to every grid node with mass. One entry per spatial dimension.
    pub gravity: Vec<T>,
    /// The number of grid nodes along each axis.
    pub resolution: Vec<usize>,
    /// How grid velocities are constrained near the domain walls.
    pub boundary: BoundaryCondition,
    /// The thickness (in nodes) of the layer along each wall where `boundary` is enforced.
    pub boundary_layer: usize,
}

impl Default for MpmParameters {
    fn default() -> Self {
        MpmParameters {
            dt: 0.01,
            dx: 0.01,
            youngs_modulus: 50.,
            poissons_ratio: 0.3,
            particle_mass: 100.,
            particle_volume: 10.,
            gravity: vec![0., 0., 0.],
            resolution: vec![100, 100, 100],
            boundary: BoundaryCondition::default(),
            boundary_layer: 3,
        }
    }
}

/// The velocity constraint applied to grid nodes in the boundary layer of a wall.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// Zero the wall-normal component only when it points out of the domain. Material may
    /// leave a wall, but never push into it. Tangential components are untouched.
    Separate,
    /// Always zero the wall-normal component. Tangential components are untouched.
    Slip,
    /// Zero the whole velocity of every node in the boundary layer.
    Stick,
}

impl Default for BoundaryCondition {
    fn default() -> Self {
        BoundaryCondition::Separate
    }
}

impl BoundaryCondition {
    /// Constrains the velocity of the node at `coord` on a grid with `size` nodes per axis.
    pub fn apply<const D: usize>(
        &self,
        velocity: &mut TV<D>,
        coord: &UV<D>,
        size: &UV<D>,
        layer: usize,
    ) {
        for d in 0..D {
            let lower = coord[d] < layer;
            let upper = coord[d] + layer >= size[d];
            if !lower && !upper {
                continue;
            }

            match self {
                BoundaryCondition::Separate => {
                    if (lower && velocity[d] < 0.) || (upper && velocity[d] > 0.) {
                        velocity[d] = 0.;
                    }
                }
                BoundaryCondition::Slip => velocity[d] = 0.,
                BoundaryCondition::Stick => {
                    *velocity = TV::zeros();
                    return;
                }
            }
        }
    }
}

impl MpmParameters {
    /// The spatial dimension implied by the attributes.
    pub fn dim(&self) -> usize {
        self.resolution.len()
    }

    /// The total number of grid nodes.
    pub fn num_cells(&self) -> usize {
        self.resolution.iter().product()
    }

    /// Checks every attribute that can be checked without seeing the particle tensors.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("dt", self.dt),
            ("dx", self.dx),
            ("E", self.youngs_modulus),
            ("nu", self.poissons_ratio),
            ("m_p", self.particle_mass),
            ("V_p", self.particle_volume),
        ];
        for &(name, value) in positive.iter() {
            if !(value.is_finite() && value > 0.) {
                return Err(MpmError::InvalidParameter {
                    name,
                    requirement: "finite and positive",
                    value,
                });
            }
        }

        // lambda = E nu / ((1 + nu)(1 - 2nu)) has a pole at nu = 0.5
        if self.poissons_ratio >= 0.5 {
            return Err(MpmError::InvalidParameter {
                name: "nu",
                requirement: "less than 0.5",
                value: self.poissons_ratio,
            });
        }

        if let Some(&value) = self.gravity.iter().find(|g| !g.is_finite()) {
            return Err(MpmError::InvalidParameter {
                name: "gravity",
                requirement: "finite",
                value,
            });
        }

        let dim = self.dim();
        if dim != 2 && dim != 3 {
            return Err(MpmError::UnsupportedDimension(dim));
        }
        self.check_dim(dim)?;

        for (axis, &value) in self.resolution.iter().enumerate() {
            if value < 3 {
                return Err(MpmError::InvalidResolution { axis, value });
            }
        }

        Ok(())
    }

    /// Checks that the vector-valued attributes match the spatial dimension of the particles.
    pub fn check_dim(&self, dim: usize) -> Result<()> {
        if self.gravity.len() != dim {
            return Err(MpmError::AttributeLength {
                name: "Gravity",
                expected: dim,
                actual: self.gravity.len(),
            });
        }
        if self.resolution.len() != dim {
            return Err(MpmError::AttributeLength {
                name: "Resolution",
                expected: dim,
                actual: self.resolution.len(),
            });
        }
        Ok(())
    }

    /// Resolves the attributes into the fixed-size form used by the kernel.
    pub fn resolve<const D: usize>(&self) -> Result<StepParameters<D>> {
        self.validate()?;
        self.check_dim(D)?;

        Ok(StepParameters {
            dt: self.dt,
            dx: self.dx,
            model: FixedCorotated::new(self.youngs_modulus, self.poissons_ratio),
            particle_mass: self.particle_mass,
            particle_volume: self.particle_volume,
            gravity: TV::from_fn(|d, _| self.gravity[d]),
            resolution: UV::from_fn(|d, _| self.resolution[d]),
            boundary: self.boundary,
            boundary_layer: self.boundary_layer,
        })
    }
}

/// Validated parameters for a `D`-dimensional step.
#[derive(Debug, Clone)]
pub struct StepParameters<const D: usize> {
    pub dt: T,
    pub dx: T,
    pub model: FixedCorotated,
    pub particle_mass: T,
    pub particle_volume: T,
    pub gravity: TV<D>,
    pub resolution: UV<D>,
    pub boundary: BoundaryCondition,
    pub boundary_layer: usize,
}
