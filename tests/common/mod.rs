//! Shape builders and global topology measures shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use ndarray::Array3;
use topology_carve::Volume;

pub const INSIDE: u8 = 1;
pub const OUTSIDE: u8 = 0;

/// Axis-aligned box `lo[d] <= p[d] < hi[d]` labelled [`INSIDE`].
pub fn solid_box(dims: [usize; 3], lo: [usize; 3], hi: [usize; 3]) -> Volume<u8> {
    Volume::from_shape_fn(dims, |p| {
        if (0..3).all(|d| p[d] >= lo[d] && p[d] < hi[d]) {
            INSIDE
        } else {
            OUTSIDE
        }
    })
}

/// `n³` cube centred in a grid with a one-voxel margin of [`OUTSIDE`] on every side.
pub fn cube(n: usize) -> Volume<u8> {
    solid_box([n + 2; 3], [1; 3], [n + 1; 3])
}

/// Square ring around the z axis: a `outer × outer` box with a centred
/// `hole × hole` tunnel, `thickness` voxels high, with a two-voxel margin.
pub fn square_torus(outer: usize, hole: usize, thickness: usize) -> Volume<u8> {
    let dims = [outer + 4, outer + 4, thickness + 4];
    let hole_lo = 2 + (outer - hole) / 2;
    Volume::from_shape_fn(dims, |[x, y, z]| {
        let in_box = (2..outer + 2).contains(&x) && (2..outer + 2).contains(&y);
        let in_hole = (hole_lo..hole_lo + hole).contains(&x) && (hole_lo..hole_lo + hole).contains(&y);
        let in_slab = (2..thickness + 2).contains(&z);
        if in_box && !in_hole && in_slab { INSIDE } else { OUTSIDE }
    })
}

/// `n³` cube with a single empty voxel at its center.
pub fn hollow_cube(n: usize) -> Volume<u8> {
    let mut volume = cube(n);
    let c = (n / 2 + 1) as isize;
    volume.set([c, c, c], OUTSIDE);
    volume
}

pub fn mask_of(volume: &Volume<u8>, label: u8) -> Array3<bool> {
    volume.data().map(|&v| v == label)
}

pub fn count(volume: &Volume<u8>, label: u8) -> usize {
    volume.data().iter().filter(|&&v| v == label).count()
}

/// Euler characteristic of the union of the closed unit cubes of `mask`.
///
/// Works on the doubled grid: an element with `k` odd coordinates is a `k`-cell,
/// and a voxel `v` owns every element in `[2v, 2v + 2]³`.
pub fn euler_characteristic(mask: &Array3<bool>) -> i64 {
    let (nx, ny, nz) = mask.dim();
    let mut cells = Array3::from_elem((2 * nx + 1, 2 * ny + 1, 2 * nz + 1), false);
    for ((x, y, z), _) in mask.indexed_iter().filter(|(_, m)| **m) {
        for a in 2 * x..=2 * x + 2 {
            for b in 2 * y..=2 * y + 2 {
                for c in 2 * z..=2 * z + 2 {
                    cells[[a, b, c]] = true;
                }
            }
        }
    }
    cells
        .indexed_iter()
        .filter(|(_, present)| **present)
        .map(|((a, b, c), _)| {
            let odd = a % 2 + b % 2 + c % 2;
            if odd % 2 == 0 { 1 } else { -1 }
        })
        .sum()
}

/// Euler characteristic of the boundary surface: twice that of the solid.
pub fn surface_euler_characteristic(mask: &Array3<bool>) -> i64 {
    2 * euler_characteristic(mask)
}

fn count_components(mask: &Array3<bool>, offsets: &[[isize; 3]]) -> usize {
    let (nx, ny, nz) = mask.dim();
    let mut seen = Array3::from_elem(mask.dim(), false);
    let mut queue = VecDeque::new();
    let mut components = 0;
    for (start, _) in mask.indexed_iter().filter(|(_, m)| **m) {
        let start = [start.0, start.1, start.2];
        if seen[start] {
            continue;
        }
        components += 1;
        seen[start] = true;
        queue.push_back(start);
        while let Some([x, y, z]) = queue.pop_front() {
            for [dx, dy, dz] in offsets {
                let n = [x as isize + dx, y as isize + dy, z as isize + dz];
                if n[0] < 0 || n[1] < 0 || n[2] < 0 {
                    continue;
                }
                let n = [n[0] as usize, n[1] as usize, n[2] as usize];
                if n[0] < nx && n[1] < ny && n[2] < nz && mask[n] && !seen[n] {
                    seen[n] = true;
                    queue.push_back(n);
                }
            }
        }
    }
    components
}

pub fn components_6(mask: &Array3<bool>) -> usize {
    count_components(mask, &[[-1, 0, 0], [1, 0, 0], [0, -1, 0], [0, 1, 0], [0, 0, -1], [0, 0, 1]])
}

pub fn components_26(mask: &Array3<bool>) -> usize {
    let mut offsets = Vec::with_capacity(26);
    for dz in -1..=1 {
        for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx, dy, dz) != (0, 0, 0) {
                    offsets.push([dx, dy, dz]);
                }
            }
        }
    }
    count_components(mask, &offsets)
}
