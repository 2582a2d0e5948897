use ndarray::Zip;
use tracing::{debug, instrument};

use crate::{
    carve_outside::{CarveOutsideParams, carve_outside},
    error::Result,
    types::Label,
    volume::Volume,
};

/// Closes small handles and gaps of the foreground (`value != background`) in place.
///
/// The foreground is grown by a ball of `radius` voxels and the growth is carved
/// back without changing topology, on a crop of the volume around the foreground.
/// Every voxel the carving keeps is set to `fill_value`, existing foreground
/// included. Returns the number of voxels whose value changed.
#[instrument(skip(volume), fields(dims = ?volume.dims()))]
pub fn fill_loops_and_gaps<T: Label>(
    volume: &mut Volume<T>,
    background: T,
    fill_value: T,
    radius: usize,
) -> Result<usize> {
    let Some(bounds) = volume.selected_region(|&v| v != background) else {
        debug!("no foreground");
        return Ok(0);
    };
    let working = bounds.pad(radius + 1).crop(&volume.region());

    let mut patch = volume.extract(&working);
    let mask = patch.map(|&v| u8::from(v != background));
    let params = CarveOutsideParams::new(1_u8, 0).with_radius(radius);
    let carved = carve_outside(&mask, None, &params)?;

    let mut changed = 0;
    Zip::from(patch.view_mut())
        .and(carved.data())
        .for_each(|value, &keep| {
            if keep != 0 && *value != fill_value {
                *value = fill_value;
                changed += 1;
            }
        });
    volume.paste(working.index, &patch);
    debug!(changed, "filled");
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_volume_is_a_no_op() {
        let mut volume = Volume::from_elem([4, 4, 4], 0_u16);
        assert_eq!(fill_loops_and_gaps(&mut volume, 0, 9, 2).unwrap(), 0);
        assert!(volume.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn plugs_a_ring_and_relabels_it() {
        // A ring of mixed labels lying in the z = 3 plane of a larger volume.
        let mut volume = Volume::from_shape_fn([8, 8, 7], |[x, y, z]| {
            let on_ring =
                z == 3 && (2..5).contains(&x) && (2..5).contains(&y) && (x, y) != (3, 3);
            if on_ring { 1 + (x % 2) as u16 } else { 0 }
        });
        let changed = fill_loops_and_gaps(&mut volume, 0, 7, 1).unwrap();

        assert_eq!(volume.get([3, 3, 3]), Some(7));
        assert_eq!(volume.get([2, 2, 3]), Some(7));
        assert_eq!(volume.get([0, 0, 0]), Some(0));
        // Eight ring voxels relabelled plus at least the hole.
        assert!(changed >= 9);
    }

    #[test]
    fn voxels_far_from_the_foreground_are_untouched() {
        let mut volume = Volume::from_elem([10, 10, 10], 0_u8);
        volume.set([1, 1, 1], 3);
        fill_loops_and_gaps(&mut volume, 0, 3, 1).unwrap();
        for ((x, y, z), &v) in volume.data().indexed_iter() {
            if x > 3 || y > 3 || z > 3 {
                assert_eq!(v, 0);
            }
        }
        assert_eq!(volume.get([1, 1, 1]), Some(3));
    }
}
