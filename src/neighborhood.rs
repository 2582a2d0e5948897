use std::ops::{Index, IndexMut};

use ndarray::ArrayView3;

use crate::{
    tables::{CENTER, NEIGHBORHOOD_SIZE, position},
    types::{Label, VoxelIndex},
};

/// Snapshot of the 3×3×3 labels around a voxel.
///
/// Cells are laid out as described in [`NEIGHBORHOOD_SIZE`]. A snapshot is a
/// plain copy: editing it never touches the volume it was sampled from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighborhood<T> {
    cells: [T; NEIGHBORHOOD_SIZE],
}

impl<T: Label> Neighborhood<T> {
    pub fn new(cells: [T; NEIGHBORHOOD_SIZE]) -> Self {
        Self { cells }
    }

    /// Builds a snapshot from the offset `(dx, dy, dz)` of each cell, each in `-1..=1`.
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(isize, isize, isize) -> T,
    {
        Self {
            cells: std::array::from_fn(|n| {
                let n = n as isize;
                f(n % 3 - 1, (n / 3) % 3 - 1, n / 9 - 1)
            }),
        }
    }

    /// Samples the neighborhood of `center` from `volume`.
    ///
    /// Cells outside the volume read as `boundary` (a constant boundary condition).
    pub fn gather(volume: &ArrayView3<'_, T>, center: VoxelIndex, boundary: T) -> Self {
        let [cx, cy, cz] = center;
        Self::from_fn(|dx, dy, dz| {
            let (x, y, z) = (cx + dx, cy + dy, cz + dz);
            if x < 0 || y < 0 || z < 0 {
                return boundary;
            }
            volume
                .get([x as usize, y as usize, z as usize])
                .copied()
                .unwrap_or(boundary)
        })
    }

    pub fn center(&self) -> T {
        self.cells[CENTER]
    }

    pub fn set_center(&mut self, value: T) {
        self.cells[CENTER] = value;
    }

    /// The cell at offset `(dx, dy, dz)` from the center.
    pub fn at(&self, dx: isize, dy: isize, dz: isize) -> T {
        self.cells[position(dx, dy, dz)]
    }

    pub fn cells(&self) -> &[T; NEIGHBORHOOD_SIZE] {
        &self.cells
    }

    /// Binary mask of the cells equal to `label`.
    pub fn mask(&self, label: T) -> [bool; NEIGHBORHOOD_SIZE] {
        self.cells.map(|v| v == label)
    }

    /// Maps every cell, e.g. to binarize a multi-state snapshot.
    pub fn map<U: Label, F: FnMut(T) -> U>(&self, f: F) -> Neighborhood<U> {
        Neighborhood {
            cells: self.cells.map(f),
        }
    }
}

impl<T> Index<usize> for Neighborhood<T> {
    type Output = T;

    fn index(&self, n: usize) -> &T {
        &self.cells[n]
    }
}

impl<T> IndexMut<usize> for Neighborhood<T> {
    fn index_mut(&mut self, n: usize) -> &mut T {
        &mut self.cells[n]
    }
}
