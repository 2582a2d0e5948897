use derive_more::{Display, From};

use crate::volume::Region;

pub type Result<T> = core::result::Result<T, TopologyError>;

#[derive(Debug, Display, From)]
pub enum TopologyError {
    /// The processed region does not contain the bounding box of the inside label.
    #[display("processed region {region:?} does not contain inside region {label_region:?}")]
    #[from(ignore)]
    PreconditionViolation { region: Region, label_region: Region },

    /// The neighborhood tables only exist for three dimensions.
    #[display("unsupported dimensionality {dimensions}, expected 3")]
    #[from(ignore)]
    UnsupportedConfiguration { dimensions: usize },

    #[display("invalid grid dimensions {dims:?}")]
    #[from(ignore)]
    InvalidDimensions { dims: Vec<usize> },

    #[display("spacing must be positive and finite, got {_0}")]
    #[from(ignore)]
    InvalidSpacing(f64),

    #[display("shape mismatch: expected {expected:?}, found {found:?}")]
    #[from(ignore)]
    ShapeMismatch { expected: [usize; 3], found: [usize; 3] },

    #[display("array shape error: {_0}")]
    Shape(ndarray::ShapeError),
}

impl std::error::Error for TopologyError {}
