use nalgebra::SVector;

use crate::error::{Result, TopologyError};

/// Largest supported dimensionality. The neighbor buffer holds `2 * MAX_DIMENSIONS` entries.
pub const MAX_DIMENSIONS: usize = 3;

const MAX_NEIGHBORS: usize = 2 * MAX_DIMENSIONS;

/// Fixed-capacity list of face neighbors, stored inline on the stack.
#[derive(Debug, Clone, Copy)]
pub struct NeighborList<const D: usize> {
    len: usize,
    items: [[isize; D]; MAX_NEIGHBORS],
}

impl<const D: usize> NeighborList<D> {
    fn new() -> Self {
        Self {
            len: 0,
            items: [[0; D]; MAX_NEIGHBORS],
        }
    }

    #[inline]
    fn push(&mut self, idx: [isize; D]) {
        self.items[self.len] = idx;
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[[isize; D]] {
        &self.items[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, [isize; D]> {
        self.as_slice().iter()
    }
}

impl<'a, const D: usize> IntoIterator for &'a NeighborList<D> {
    type Item = &'a [isize; D];
    type IntoIter = std::slice::Iter<'a, [isize; D]>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Regular n-dimensional grid with face adjacency.
///
/// The graph is never materialized: neighbors and flat indices are derived from
/// the dimensions and strides. Axis 0 runs fastest:
///
/// ```text
/// flat(idx) = idx[0] * strides[0] + idx[1] * strides[1] + ...
/// strides   = [1, dims[0], dims[0] * dims[1], ...]
/// ```
#[derive(Debug, Clone)]
pub struct UniformGridGraph<const D: usize> {
    dims: [isize; D],
    strides: [usize; D],
    spacing: [f64; D],
    size: usize,
}

impl<const D: usize> UniformGridGraph<D> {
    /// Creates a grid graph.
    ///
    /// Returns [`TopologyError::UnsupportedConfiguration`] for `D == 0` or
    /// `D > MAX_DIMENSIONS`, and [`TopologyError::InvalidDimensions`] if any axis is empty
    /// or too large for a signed index.
    pub fn new(dims: [usize; D], spacing: [f64; D]) -> Result<Self> {
        if D == 0 || D > MAX_DIMENSIONS {
            return Err(TopologyError::UnsupportedConfiguration { dimensions: D });
        }
        if dims.iter().any(|&n| n == 0 || isize::try_from(n).is_err()) {
            return Err(TopologyError::InvalidDimensions {
                dims: dims.to_vec(),
            });
        }
        if let Some(&bad) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(TopologyError::InvalidSpacing(bad));
        }

        let mut strides = [0; D];
        let mut size = 1_usize;
        for d in 0..D {
            strides[d] = size;
            size = size
                .checked_mul(dims[d])
                .ok_or_else(|| TopologyError::InvalidDimensions {
                    dims: dims.to_vec(),
                })?;
        }

        Ok(Self {
            dims: dims.map(|n| n as isize),
            strides,
            spacing,
            size,
        })
    }

    /// Total number of nodes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn shape(&self) -> [isize; D] {
        self.dims
    }

    pub fn strides(&self) -> [usize; D] {
        self.strides
    }

    pub fn spacing(&self) -> [f64; D] {
        self.spacing
    }

    /// Returns `true` if every component of `idx` lies in `0..dims[d]`.
    #[inline]
    pub fn contains(&self, idx: &[isize; D]) -> bool {
        idx.iter().zip(self.dims.iter()).all(|(&i, &n)| i >= 0 && i < n)
    }

    /// Flat index of `idx`. The caller guarantees `contains(idx)`.
    #[inline]
    pub fn flat(&self, idx: &[isize; D]) -> usize {
        idx.iter()
            .zip(self.strides.iter())
            .map(|(&i, &s)| i as usize * s)
            .sum()
    }

    /// Inverse of [`flat`](UniformGridGraph::flat).
    #[inline]
    pub fn unflat(&self, mut flat: usize) -> [isize; D] {
        let mut idx = [0; D];
        for d in (0..D).rev() {
            idx[d] = (flat / self.strides[d]) as isize;
            flat %= self.strides[d];
        }
        idx
    }

    /// Physical (anisotropic) Euclidean distance between two nodes.
    pub fn length(&self, a: &[isize; D], b: &[isize; D]) -> f64 {
        SVector::<f64, D>::from_fn(|d, _| (a[d] - b[d]) as f64 * self.spacing[d]).norm()
    }

    /// Face-adjacent neighbors of `idx` that lie inside the grid.
    ///
    /// Directions that leave the grid are skipped, so corner nodes have `D` neighbors
    /// and interior nodes have `2 * D`.
    #[inline]
    pub fn neighbors(&self, idx: &[isize; D]) -> NeighborList<D> {
        let mut list = NeighborList::new();
        for d in 0..D {
            if idx[d] > 0 {
                let mut n = *idx;
                n[d] -= 1;
                list.push(n);
            }
            if idx[d] + 1 < self.dims[d] {
                let mut n = *idx;
                n[d] += 1;
                list.push(n);
            }
        }
        list
    }
}
