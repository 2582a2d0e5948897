/// Number of cells in a 3×3×3 neighborhood.
///
/// Cells are stored with x running fastest, so the cell at offset `(dx, dy, dz)`
/// sits at `CENTER + dx + 3 * dy + 9 * dz`:
///
/// ```text
///   z = -1            z = 0             z = +1
///   0  1  2           9 10 11          18 19 20
///   3  4  5          12 13 14          21 22 23
///   6  7  8          15 16 17          24 25 26
/// ```
pub const NEIGHBORHOOD_SIZE: usize = 27;

/// Linear position of the center cell.
pub const CENTER: usize = NEIGHBORHOOD_SIZE / 2;

/// Linear stride of one step along x, y and z.
pub const AXIS_STRIDES: [isize; 3] = [1, 3, 9];

/// Offsets of the six face neighbors: -x, +x, -y, +y, -z, +z.
pub const FACE_OFFSETS: [isize; 6] = [-1, 1, -3, 3, -9, 9];

/// The twelve edges around the center, as pairs of face offsets.
///
/// An edge is shared by the two face cells and the diagonal cell at `a + b`.
pub const EDGE_OFFSETS: [[isize; 2]; 12] = [
    [-1, -3],
    [1, -3],
    [-1, 3],
    [1, 3],
    [-1, -9],
    [1, -9],
    [-1, 9],
    [1, 9],
    [-3, -9],
    [3, -9],
    [-3, 9],
    [3, 9],
];

/// The eight corners around the center, as triples of face offsets (x, y, z).
pub const VERTEX_OFFSETS: [[isize; 3]; 8] = [
    [-1, -3, -9],
    [1, -3, -9],
    [-1, 3, -9],
    [1, 3, -9],
    [-1, -3, 9],
    [1, -3, 9],
    [-1, 3, 9],
    [1, 3, 9],
];

/// Grid coordinates in `{0, 1, 2}³` of each linear position.
pub const IJK_LUT: [[u8; 3]; NEIGHBORHOOD_SIZE] = [
    [0, 0, 0],
    [1, 0, 0],
    [2, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [2, 1, 0],
    [0, 2, 0],
    [1, 2, 0],
    [2, 2, 0],
    [0, 0, 1],
    [1, 0, 1],
    [2, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
    [2, 1, 1],
    [0, 2, 1],
    [1, 2, 1],
    [2, 2, 1],
    [0, 0, 2],
    [1, 0, 2],
    [2, 0, 2],
    [0, 1, 2],
    [1, 1, 2],
    [2, 1, 2],
    [0, 2, 2],
    [1, 2, 2],
    [2, 2, 2],
];

/// Returns the linear position of a cell given its offset from the center.
#[inline]
pub const fn position(dx: isize, dy: isize, dz: isize) -> usize {
    (CENTER as isize + dx * AXIS_STRIDES[0] + dy * AXIS_STRIDES[1] + dz * AXIS_STRIDES[2]) as usize
}

/// Returns the linear position `CENTER + offset`.
#[inline]
pub(crate) const fn at(offset: isize) -> usize {
    (CENTER as isize + offset) as usize
}
