//! Topology-preserving carving of binary voxel masks.
//!
//! [`carve_inside`] shrinks every connected component of an inside region to a
//! genus-0 blob grown from its deepest voxel. [`carve_outside`] grows the region
//! into a shell and erodes the shell back, filling cavities and plugging handles.
//! Both accept only simple-point edits (see [`topology`]).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod carve_inside;
pub mod carve_outside;
pub mod components;
pub mod control;
pub mod distance;
pub mod editing;
pub mod error;
pub mod graph;
pub mod morphology;
pub mod neighborhood;
pub mod queue;
pub mod tables;
pub mod topology;
pub mod types;
pub mod volume;

pub use carve_inside::{CarveInsideParams, carve_inside, carve_inside_with};
pub use carve_outside::{CarveOutsideParams, PixelState, carve_outside, carve_outside_with};
pub use control::{CancelPolicy, CancelToken, Control, Outcome};
pub use editing::fill_loops_and_gaps;
pub use error::{Result, TopologyError};
pub use volume::{Region, Volume, VolumeSource};
