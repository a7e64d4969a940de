//! One explicit MLS-MPM step: particle to grid, grid velocity update, grid to particle.

pub mod algo;
pub mod batch;
pub mod grid;
pub mod models;
pub mod parameters;
pub mod particles;

pub use batch::{step, MpmOperator};
pub use models::{ConstitutiveModel, FixedCorotated, PolarDecomposition};
pub use parameters::{BoundaryCondition, MpmParameters, StepParameters};
pub use particles::MpmParticles;
