use ndarray::{Array3, ArrayView3, Zip, s};

/// Binary dilation by a structuring element of integer voxel radius.
pub trait DilationProvider {
    /// Returns `mask` grown by `radius` voxels. `radius == 0` returns a copy of `mask`.
    fn dilate(&self, mask: &ArrayView3<'_, bool>, radius: usize) -> Array3<bool>;
}

/// Dilation by a flat ball: every offset with `dx² + dy² + dz² <= r²`.
///
/// The mask is shifted by each ball offset and OR-ed into the result, the shift
/// being expressed as a pair of overlapping slices. Voxels pushed past the grid are
/// dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct BallDilation;

impl BallDilation {
    /// Offsets of the ball of radius `radius`, center included.
    pub fn offsets(radius: usize) -> Vec<[isize; 3]> {
        let r = radius as isize;
        let r2 = r * r;
        let mut offsets = Vec::new();
        for dz in -r..=r {
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy + dz * dz <= r2 {
                        offsets.push([dx, dy, dz]);
                    }
                }
            }
        }
        offsets
    }
}

impl DilationProvider for BallDilation {
    fn dilate(&self, mask: &ArrayView3<'_, bool>, radius: usize) -> Array3<bool> {
        let mut out = mask.to_owned();
        if radius == 0 {
            return out;
        }
        let (nx, ny, nz) = mask.dim();
        let dims = [nx as isize, ny as isize, nz as isize];

        for offset in Self::offsets(radius) {
            if offset == [0, 0, 0] || (0..3).any(|d| offset[d].abs() >= dims[d]) {
                continue;
            }
            // dst[i] |= src[i - offset]
            let dst = [0, 1, 2].map(|d| (offset[d].max(0), dims[d] + offset[d].min(0)));
            let src = [0, 1, 2].map(|d| ((-offset[d]).max(0), dims[d] - offset[d].max(0)));
            Zip::from(out.slice_mut(s![
                dst[0].0..dst[0].1,
                dst[1].0..dst[1].1,
                dst[2].0..dst[2].1
            ]))
            .and(mask.slice(s![
                src[0].0..src[0].1,
                src[1].0..src[1].1,
                src[2].0..src[2].1
            ]))
            .par_for_each(|o, &m| *o |= m);
        }
        out
    }
}
