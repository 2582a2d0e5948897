use std::collections::VecDeque;

use ndarray::{Array3, ArrayView3};

use crate::{error::Result, graph::UniformGridGraph, types::Label};

/// Labels the connected regions of a volume.
pub trait ConnectedComponentsProvider {
    /// Returns a component id per voxel and the number of components.
    ///
    /// Voxels equal to `background` get id `0`; components are numbered `1..=count`.
    /// Any two face-adjacent non-background voxels belong to the same component.
    fn label_components<T: Label>(
        &self,
        volume: &ArrayView3<'_, T>,
        background: T,
    ) -> Result<(Array3<u32>, usize)>;
}

/// Breadth-first 6-connected labeling.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaceConnectedLabeling;

impl ConnectedComponentsProvider for FaceConnectedLabeling {
    fn label_components<T: Label>(
        &self,
        volume: &ArrayView3<'_, T>,
        background: T,
    ) -> Result<(Array3<u32>, usize)> {
        let (nx, ny, nz) = volume.dim();
        let mut labels = Array3::<u32>::zeros((nx, ny, nz));
        if volume.is_empty() {
            return Ok((labels, 0));
        }

        let graph = UniformGridGraph::new([nx, ny, nz], [1.0; 3])?;
        let mut queue = VecDeque::new();
        let mut count = 0_u32;

        for ((x, y, z), &value) in volume.indexed_iter() {
            if value == background || labels[[x, y, z]] != 0 {
                continue;
            }
            count += 1;
            labels[[x, y, z]] = count;
            queue.push_back([x as isize, y as isize, z as isize]);

            while let Some(idx) = queue.pop_front() {
                for n in &graph.neighbors(&idx) {
                    let n_idx = [n[0] as usize, n[1] as usize, n[2] as usize];
                    if volume[n_idx] != background && labels[n_idx] == 0 {
                        labels[n_idx] = count;
                        queue.push_back(*n);
                    }
                }
            }
        }

        Ok((labels, count as usize))
    }
}
