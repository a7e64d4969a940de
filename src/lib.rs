//! A single explicit step of an MLS-MPM simulation (APIC transfers, fixed-corotated elasticity),
//! batched over independent simulation instances.
//!
//! The entry point for hosts that hand over flat tensors is [`MpmOperator`]: bind the parameters
//! once, then call [`MpmOperator::step`] with an [`MpmInputs`] to get an [`MpmOutputs`].

extern crate nalgebra as na;

pub mod error;
pub mod initial_condition;
pub mod math;
pub mod mpm;
pub mod statistics;
pub mod tensor;
pub mod util;

pub use error::{MpmError, Result};
pub use mpm::{BoundaryCondition, MpmOperator, MpmParameters};
pub use tensor::{MpmInputs, MpmOutputs, Tensor};
