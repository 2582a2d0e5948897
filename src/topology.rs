use std::collections::VecDeque;

use crate::{
    neighborhood::Neighborhood,
    tables::{
        AXIS_STRIDES, CENTER, EDGE_OFFSETS, FACE_OFFSETS, IJK_LUT, NEIGHBORHOOD_SIZE,
        VERTEX_OFFSETS, at,
    },
    types::Label,
};

/// Returns `true` if toggling the center leaves the Euler characteristic of the
/// `label` set unchanged.
///
/// Uses the face-connected convention: a face, edge or vertex of the center cube
/// counts only if every other voxel incident to it equals `label`. The center cube
/// itself always contributes one parallelepiped:
///
/// ```text
/// V - E + F - P == 0
/// ```
///
/// The center cell is never read.
pub fn euler_invariant<T: Label>(neighbors: &Neighborhood<T>, label: T) -> bool {
    let is = |offset: isize| neighbors[at(offset)] == label;

    let p = 1;

    let f = FACE_OFFSETS.iter().filter(|&&o| is(o)).count() as i32;

    let e = EDGE_OFFSETS
        .iter()
        .filter(|&&[a, b]| is(a) && is(b) && is(a + b))
        .count() as i32;

    let v = VERTEX_OFFSETS
        .iter()
        .filter(|&&[x, y, z]| {
            is(x) && is(y) && is(z) && is(x + y) && is(x + z) && is(y + z) && is(x + y + z)
        })
        .count() as i32;

    v - e + f - p == 0
}

/// Number of face-connected components of `label` cells within the neighborhood.
pub fn connected_components<T: Label>(neighbors: &Neighborhood<T>, label: T) -> usize {
    count_components(&neighbors.mask(label))
}

/// Breadth-first flood fill over a 27-cell mask with 6-connectivity.
fn count_components(mask: &[bool; NEIGHBORHOOD_SIZE]) -> usize {
    let mut visited = [false; NEIGHBORHOOD_SIZE];
    let mut queue = VecDeque::with_capacity(NEIGHBORHOOD_SIZE);
    let mut count = 0;

    for seed in 0..NEIGHBORHOOD_SIZE {
        if !mask[seed] || visited[seed] {
            continue;
        }
        count += 1;
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(id) = queue.pop_front() {
            let ijk = IJK_LUT[id];
            for axis in 0..3 {
                let stride = AXIS_STRIDES[axis] as usize;
                if ijk[axis] < 2 {
                    visit(id + stride, mask, &mut visited, &mut queue);
                }
                if ijk[axis] > 0 {
                    visit(id - stride, mask, &mut visited, &mut queue);
                }
            }
        }
    }

    count
}

#[inline]
fn visit(
    n: usize,
    mask: &[bool; NEIGHBORHOOD_SIZE],
    visited: &mut [bool; NEIGHBORHOOD_SIZE],
    queue: &mut VecDeque<usize>,
) {
    if mask[n] && !visited[n] {
        visited[n] = true;
        queue.push_back(n);
    }
}

/// Returns `true` if the number of `label` components is the same with the center
/// set to `label` and with the center set to anything else.
pub fn cc_invariant<T: Label>(neighbors: &Neighborhood<T>, label: T) -> bool {
    let mut mask = neighbors.mask(label);

    mask[CENTER] = true;
    let with_center = count_components(&mask);

    mask[CENTER] = false;
    let without_center = count_components(&mask);

    with_center == without_center
}

/// Returns `true` if removing the center would leave a non-manifold edge.
///
/// For each pair of axes, a non-manifold edge appears when both face neighbors along
/// those axes equal `label` but the diagonal cell between them does not.
pub fn nonmanifold_remove<T: Label>(neighbors: &Neighborhood<T>, label: T) -> bool {
    let is = |offset: isize| neighbors[at(offset)] == label;

    EDGE_OFFSETS
        .iter()
        .any(|&[a, b]| is(a) && is(b) && !is(a + b))
}

/// `euler_invariant` and `cc_invariant` for a single label.
pub fn is_simple<T: Label>(neighbors: &Neighborhood<T>, label: T) -> bool {
    euler_invariant(neighbors, label) && cc_invariant(neighbors, label)
}
