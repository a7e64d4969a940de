use thiserror::Error;

/// Everything that can stop a step before any numeric work is done.
///
/// Numerical trouble (empty grid nodes, degenerate deformation gradients) is never reported
/// here; those cases are handled in place with well-defined fallback values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MpmError {
    #[error("parameter `{name}` must be {requirement}, but is {value}")]
    InvalidParameter {
        name: &'static str,
        requirement: &'static str,
        value: f32,
    },

    #[error("{name} length must be equal to {expected}, but is {actual}")]
    AttributeLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("resolution along axis {axis} must be at least 3 nodes, but is {value}")]
    InvalidResolution { axis: usize, value: usize },

    #[error("only 2D and 3D simulations are supported, got dimension {0}")]
    UnsupportedDimension(usize),

    #[error("`{name}` must have rank {expected}, but has shape {actual:?}")]
    Rank {
        name: &'static str,
        expected: usize,
        actual: Vec<usize>,
    },

    #[error("{what} of `{name}` (shape {shape:?}) must be {expected}")]
    ShapeMismatch {
        what: &'static str,
        name: &'static str,
        shape: Vec<usize>,
        expected: usize,
    },

    #[error("`{name}` holds {actual} values, but its shape requires {expected}")]
    BufferLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, MpmError>;
