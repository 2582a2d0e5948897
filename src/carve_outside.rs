use ndarray::{Array3, Axis, Slice, Zip, s};
use tracing::{debug, instrument, trace};

use crate::{
    carve_inside::check_region,
    components::{ConnectedComponentsProvider, FaceConnectedLabeling},
    control::{Control, Outcome},
    distance::{DistanceMapProvider, DistanceOptions, SeparableEdt},
    error::{Result, TopologyError},
    graph::UniformGridGraph,
    morphology::{BallDilation, DilationProvider},
    neighborhood::Neighborhood,
    queue::VoxelQueue,
    topology::{cc_invariant, euler_invariant, nonmanifold_remove},
    types::{Distance, Label},
    volume::{Region, Volume},
};

/// Default ball radius used when no outer mask is given.
pub const DEFAULT_RADIUS: usize = 1;

/// Classification of a voxel of the padded working volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelState {
    Background,
    /// Part of the input inside region. Never changes.
    HardForeground,
    /// Shell voxel not reached by the erosion front yet.
    Dilated,
    /// Shell voxel that has been queued. It stays foreground unless eroded.
    Visited,
}

impl PixelState {
    pub fn is_foreground(self) -> bool {
        self != PixelState::Background
    }
}

/// Parameters of [`carve_outside`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarveOutsideParams<T> {
    pub inside_value: T,
    /// Label of the background; the grid border reads as this label.
    pub outside_value: T,
    /// Ball radius in voxels of the shell grown when no outer mask is given.
    pub radius: usize,
    /// Also keep shell voxels whose removal would leave a non-manifold edge.
    pub enforce_manifold: bool,
    /// Processed region. Must contain the bounding box of `inside_value`. Voxels
    /// outside it never change.
    pub region: Option<Region>,
}

impl<T: Label> CarveOutsideParams<T> {
    pub fn new(inside_value: T, outside_value: T) -> Self {
        Self {
            inside_value,
            outside_value,
            radius: DEFAULT_RADIUS,
            enforce_manifold: false,
            region: None,
        }
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_enforce_manifold(mut self, enforce_manifold: bool) -> Self {
        self.enforce_manifold = enforce_manifold;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }
}

/// Carves the shell around the `inside_value` region of `volume`.
///
/// The shell is `mask` minus the inside region, or the ball dilation of the inside
/// region by `params.radius` when `mask` is `None`. Every shell voxel the erosion
/// cannot remove becomes `inside_value`; all other voxels keep their input value.
///
/// # Errors
///
/// [`TopologyError::ShapeMismatch`] if `mask` and `volume` differ in size,
/// [`TopologyError::PreconditionViolation`] if `params.region` misses part of the
/// inside region.
#[instrument(skip_all, fields(dims = ?volume.dims(), radius = params.radius))]
pub fn carve_outside<T: Label>(
    volume: &Volume<T>,
    mask: Option<&Volume<bool>>,
    params: &CarveOutsideParams<T>,
) -> Result<Volume<T>> {
    let mut carver = OutsideCarver::new(volume, mask, params, &SeparableEdt, &BallDilation)?;
    carver.run(&mut Control::new());
    Ok(carver.finish(volume))
}

/// [`carve_outside`] with explicit collaborators, cancellation and progress.
#[instrument(skip_all, fields(dims = ?volume.dims(), radius = params.radius))]
pub fn carve_outside_with<T, D, G>(
    volume: &Volume<T>,
    mask: Option<&Volume<bool>>,
    params: &CarveOutsideParams<T>,
    distance: &D,
    dilation: &G,
    mut control: Control<'_>,
) -> Result<Outcome<T>>
where
    T: Label,
    D: DistanceMapProvider,
    G: DilationProvider,
{
    let mut carver = OutsideCarver::new(volume, mask, params, distance, dilation)?;
    let finished = carver.run(&mut control);
    Ok(control.resolve(finished, || carver.finish(volume)))
}

/// Working state. Every array is padded by one background voxel on each side, so
/// shell voxels on the grid border face the background too.
struct OutsideCarver<T> {
    inside_value: T,
    enforce_manifold: bool,
    graph: UniformGridGraph<3>,
    states: Array3<PixelState>,
    distance: Array3<Distance>,
    queue: VoxelQueue,
    enqueued: usize,
}

impl<T: Label> OutsideCarver<T> {
    fn new<D, G>(
        volume: &Volume<T>,
        mask: Option<&Volume<bool>>,
        params: &CarveOutsideParams<T>,
        distance: &D,
        dilation: &G,
    ) -> Result<Self>
    where
        D: DistanceMapProvider,
        G: DilationProvider,
    {
        check_region(volume, params.region, params.inside_value)?;
        let dims = volume.dims();
        if let Some(mask) = mask
            && mask.dims() != dims
        {
            return Err(TopologyError::ShapeMismatch {
                expected: dims,
                found: mask.dims(),
            });
        }

        let spacing = volume.spacing();
        let inside = volume.data().map(|&v| v == params.inside_value);
        let outer = match mask {
            Some(mask) => mask.data().clone(),
            None => dilation.dilate(&inside.view(), params.radius),
        };
        let region = params
            .region
            .unwrap_or_else(|| volume.region())
            .crop(&volume.region());

        let padded = dims.map(|n| n + 2);
        let mut states = Array3::from_elem(padded, PixelState::Background);
        Zip::indexed(states.slice_mut(s![1..-1, 1..-1, 1..-1]))
            .and(&inside)
            .and(&outer)
            .for_each(|(x, y, z), state, &hard, &grown| {
                let idx = [x as isize, y as isize, z as isize];
                *state = if hard {
                    PixelState::HardForeground
                } else if grown && region.contains_index(&idx) {
                    PixelState::Dilated
                } else {
                    PixelState::Background
                };
            });

        let detached = detach_unanchored(&mut states)?;
        if detached > 0 {
            debug!(detached, "dropped shell voxels not connected to the inside region");
        }

        let hard = states.map(|&s| s == PixelState::HardForeground);
        let distance = distance.distance_map(
            &hard.view(),
            false,
            &spacing,
            DistanceOptions::inside_negative(),
        );
        let graph = UniformGridGraph::new(padded, [spacing[0], spacing[1], spacing[2]])?;

        let mut carver = Self {
            inside_value: params.inside_value,
            enforce_manifold: params.enforce_manifold,
            graph,
            states,
            distance,
            queue: VoxelQueue::new(),
            enqueued: 0,
        };
        carver.seed();
        Ok(carver)
    }

    /// Queues every shell voxel next to the background along some grid line.
    fn seed(&mut self) {
        let mut frontier = Array3::from_elem(self.states.dim(), false);
        let (head, tail) = (Slice::from(..-1_isize), Slice::from(1_isize..));
        for axis in 0..3 {
            for (here, next) in [(head, tail), (tail, head)] {
                Zip::from(frontier.slice_axis_mut(Axis(axis), here))
                    .and(self.states.slice_axis(Axis(axis), here))
                    .and(self.states.slice_axis(Axis(axis), next))
                    .for_each(|seed, &a, &b| {
                        if a == PixelState::Dilated && b == PixelState::Background {
                            *seed = true;
                        }
                    });
            }
        }

        for ((x, y, z), _) in frontier.indexed_iter().filter(|(_, seed)| **seed) {
            self.enqueue([x as isize, y as isize, z as isize]);
        }
        debug!(seeds = self.queue.len(), "seeded");
    }

    fn enqueue(&mut self, idx: [isize; 3]) {
        let at = idx.map(|i| i as usize);
        self.states[at] = PixelState::Visited;
        self.queue.push(self.distance[at], self.graph.flat(&idx));
        self.enqueued += 1;
    }

    /// A shell voxel may go when it is simple for both the foreground and the
    /// background, and, if requested, its removal leaves no non-manifold edge.
    fn is_erodable(&self, center: [isize; 3]) -> bool {
        let hood = Neighborhood::gather(&self.states.view(), center, PixelState::Background)
            .map(|s| u8::from(s.is_foreground()));
        euler_invariant(&hood, 1)
            && cc_invariant(&hood, 1)
            && cc_invariant(&hood, 0)
            && !(self.enforce_manifold && nonmanifold_remove(&hood, 1))
    }

    /// Single erosion pass over the frontier. Returns `false` if cancelled.
    fn run(&mut self, control: &mut Control<'_>) -> bool {
        let (mut visited, mut eroded) = (0_usize, 0_usize);
        while let Some(node) = self.queue.pop() {
            if control.is_cancelled() {
                debug!(visited, eroded, "cancelled");
                return false;
            }
            visited += 1;

            let center = self.graph.unflat(node.index);
            let at = center.map(|i| i as usize);
            if self.states[at] != PixelState::Visited {
                continue;
            }
            if self.is_erodable(center) {
                self.states[at] = PixelState::Background;
                eroded += 1;
            } else {
                trace!(?at, priority = node.priority, "retained");
            }

            for n in &self.graph.neighbors(&center) {
                if self.states[n.map(|i| i as usize)] == PixelState::Dilated {
                    self.enqueue(*n);
                }
            }
            control.tick(visited, self.enqueued);
        }

        control.report(visited, self.enqueued);
        debug!(visited, eroded, retained = visited - eroded, "erosion finished");
        true
    }

    /// Foreground states become `inside_value`, the rest passes through from `input`.
    fn finish(self, input: &Volume<T>) -> Volume<T> {
        let mut data = input.data().clone();
        Zip::from(&mut data)
            .and(self.states.slice(s![1..-1, 1..-1, 1..-1]))
            .for_each(|value, state| {
                if state.is_foreground() {
                    *value = self.inside_value;
                }
            });
        Volume::from_parts(data, input.spacing())
    }
}

/// Resets to background every shell voxel whose face-connected foreground
/// component holds no inside voxel. Returns how many were reset.
fn detach_unanchored(states: &mut Array3<PixelState>) -> Result<usize> {
    let (labels, count) =
        FaceConnectedLabeling.label_components(&states.view(), PixelState::Background)?;

    let mut anchored = vec![false; count + 1];
    Zip::from(&labels).and(&*states).for_each(|&label, &state| {
        if state == PixelState::HardForeground {
            anchored[label as usize] = true;
        }
    });

    let mut detached = 0;
    Zip::from(&mut *states).and(&labels).for_each(|state, &label| {
        if *state == PixelState::Dilated && !anchored[label as usize] {
            *state = PixelState::Background;
            detached += 1;
        }
    });
    Ok(detached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{CancelPolicy, CancelToken};

    fn cube(dims: [usize; 3], lo: usize, hi: usize) -> Volume<u8> {
        Volume::from_shape_fn(dims, |p| u8::from(p.iter().all(|&i| i >= lo && i < hi)))
    }

    /// A 3×3 ring of thickness one around a single hole at `[2, 2, 2]`.
    fn ring() -> Volume<u8> {
        Volume::from_shape_fn([5, 5, 5], |[x, y, z]| {
            u8::from(z == 2 && (1..4).contains(&x) && (1..4).contains(&y) && (x, y) != (2, 2))
        })
    }

    #[test]
    fn cube_is_unchanged() {
        let volume = cube([9, 9, 9], 2, 7);
        let out = carve_outside(&volume, None, &CarveOutsideParams::new(1, 0)).unwrap();
        assert_eq!(out, volume);
    }

    #[test]
    fn masked_cavity_is_filled() {
        let mut volume = cube([9, 9, 9], 2, 7);
        volume.set([4, 4, 4], 0);
        // Something outside the mask that must pass through.
        volume.set([0, 0, 0], 5);
        let mask = cube([9, 9, 9], 1, 8).map(|&v| v == 1);

        let out = carve_outside(&volume, Some(&mask), &CarveOutsideParams::new(1, 0)).unwrap();
        assert_eq!(out.get([4, 4, 4]), Some(1));
        for ((x, y, z), &m) in mask.data().indexed_iter() {
            if !m {
                let idx = [x as isize, y as isize, z as isize];
                assert_eq!(out.get(idx), volume.get(idx));
            }
        }
    }

    #[test]
    fn mask_blob_away_from_the_inside_region_is_ignored() {
        let volume = Volume::from_shape_fn([12, 7, 7], |p| {
            u8::from(p.iter().all(|&i| (1..4).contains(&i)))
        });
        let mask = Volume::from_shape_fn([12, 7, 7], |[x, y, z]| {
            let near = [x, y, z].iter().all(|&i| i < 5);
            let apart = (7..11).contains(&x) && (1..5).contains(&y) && (1..5).contains(&z);
            near || apart
        });

        let out = carve_outside(&volume, Some(&mask), &CarveOutsideParams::new(1, 0)).unwrap();
        for ((x, y, z), &v) in out.data().indexed_iter() {
            if x >= 5 {
                assert_eq!(v, 0, "voxel {:?} gained the inside label", (x, y, z));
            }
        }
        assert_eq!(out.get([2, 2, 2]), Some(1));
    }

    /// One shell voxel at `[2, 2, 2]` lying on a 3×3 inside plate, with inside
    /// voxels on its -x and +y faces but not on the edge between them. Removing
    /// it is simple, yet leaves that edge non-manifold.
    fn notch() -> (Volume<u8>, Volume<bool>) {
        let volume = Volume::from_shape_fn([5, 5, 5], |[x, y, z]| {
            let plate = z == 1 && (1..4).contains(&x) && (1..4).contains(&y);
            u8::from(plate || [x, y, z] == [1, 2, 2] || [x, y, z] == [2, 3, 2])
        });
        let mut mask = volume.map(|&v| v == 1);
        mask.set([2, 2, 2], true);
        (volume, mask)
    }

    #[test]
    fn notch_voxel_is_simple_but_nonmanifold() {
        let (volume, _) = notch();
        let hood = Neighborhood::gather(&volume.view(), [2, 2, 2], 0);
        assert!(euler_invariant(&hood, 1));
        assert!(cc_invariant(&hood, 1));
        assert!(cc_invariant(&hood, 0));
        assert!(nonmanifold_remove(&hood, 1));
    }

    #[test]
    fn enforce_manifold_keeps_the_notch_voxel() {
        let (volume, mask) = notch();

        let relaxed = carve_outside(&volume, Some(&mask), &CarveOutsideParams::new(1, 0)).unwrap();
        assert_eq!(relaxed, volume);

        let params = CarveOutsideParams::new(1, 0).with_enforce_manifold(true);
        let strict = carve_outside(&volume, Some(&mask), &params).unwrap();
        assert_ne!(strict, relaxed);
        assert_eq!(strict.get([2, 2, 2]), Some(1));

        let mut expected = volume.clone();
        expected.set([2, 2, 2], 1);
        assert_eq!(strict, expected);
    }

    #[test]
    fn ring_hole_is_plugged() {
        let volume = ring();
        for enforce_manifold in [false, true] {
            let params = CarveOutsideParams::new(1, 0).with_enforce_manifold(enforce_manifold);
            let out = carve_outside(&volume, None, &params).unwrap();
            assert_eq!(out.get([2, 2, 2]), Some(1));
            for (a, b) in volume.data().iter().zip(out.data().iter()) {
                assert!(*a == 0 || *b == 1, "inside voxels never change");
            }
        }
    }

    #[test]
    fn radius_zero_leaves_input_alone() {
        let volume = ring();
        let params = CarveOutsideParams::new(1, 0).with_radius(0);
        assert_eq!(carve_outside(&volume, None, &params).unwrap(), volume);
    }

    #[test]
    fn mask_shape_is_checked() {
        let volume = cube([5, 5, 5], 1, 4);
        let mask = Volume::from_elem([5, 5, 4], true);
        let err = carve_outside(&volume, Some(&mask), &CarveOutsideParams::new(1, 0)).unwrap_err();
        assert!(matches!(err, TopologyError::ShapeMismatch { .. }));
    }

    #[test]
    fn region_must_contain_the_inside_label() {
        let volume = cube([6, 6, 6], 1, 5);
        let params = CarveOutsideParams::new(1, 0).with_region(Region::new([0, 0, 0], [4, 6, 6]));
        let err = carve_outside(&volume, None, &params).unwrap_err();
        assert!(matches!(err, TopologyError::PreconditionViolation { .. }));
    }

    #[test]
    fn shell_stays_inside_the_region() {
        let volume = ring();
        let region = Region::new([1, 1, 2], [3, 3, 1]);
        let params = CarveOutsideParams::new(1, 0).with_region(region);
        let out = carve_outside(&volume, None, &params).unwrap();
        assert_eq!(out.get([2, 2, 2]), Some(1));
        for ((x, y, z), v) in out.data().indexed_iter() {
            let idx = [x as isize, y as isize, z as isize];
            if !region.contains_index(&idx) {
                assert_eq!(Some(*v), volume.get(idx));
            }
        }
    }

    #[test]
    fn cancelled_run_follows_policy() {
        let volume = ring();
        let params = CarveOutsideParams::new(1, 0);
        let token = CancelToken::new();
        token.cancel();

        let aborted = carve_outside_with(
            &volume,
            None,
            &params,
            &SeparableEdt,
            &BallDilation,
            Control::new().with_cancel(&token),
        )
        .unwrap();
        assert_eq!(aborted, Outcome::Aborted);

        // Nothing was eroded, so the whole dilated shell is still in place.
        let partial = carve_outside_with(
            &volume,
            None,
            &params,
            &SeparableEdt,
            &BallDilation,
            Control::new()
                .with_cancel(&token)
                .with_policy(CancelPolicy::Finalize),
        )
        .unwrap()
        .into_volume()
        .unwrap();
        let dilated = BallDilation.dilate(&volume.data().map(|&v| v == 1).view(), 1);
        let expected = dilated.map(|&d| u8::from(d));
        assert_eq!(partial.data(), &expected);
    }

    #[test]
    fn progress_reports_the_final_count() {
        let volume = ring();
        let mut last = None;
        let mut record = |visited: usize, enqueued: usize| last = Some((visited, enqueued));
        carve_outside_with(
            &volume,
            None,
            &CarveOutsideParams::new(1, 0),
            &SeparableEdt,
            &BallDilation,
            Control::new().with_progress(&mut record),
        )
        .unwrap();
        let (visited, enqueued) = last.unwrap();
        assert_eq!(visited, enqueued);
        assert!(visited > 0);
    }
}
