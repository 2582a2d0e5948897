use std::fmt::Debug;

use nalgebra::Vector3;

/// Signed `[x, y, z]` voxel index.
pub type VoxelIndex = [isize; 3];

/// Physical size of a voxel along each axis.
pub type Spacing = Vector3<f64>;

/// Scalar priority / distance value.
pub type Distance = f32;

/// A voxel label: anything that can be copied, compared and shared between threads.
///
/// Blanket-implemented, so `u8`, `u16`, `i32`, `bool`, `f32` etc. all qualify.
pub trait Label: Copy + PartialEq + Debug + Send + Sync {}

impl<T> Label for T where T: Copy + PartialEq + Debug + Send + Sync {}
