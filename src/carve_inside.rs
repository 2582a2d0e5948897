use ndarray::Array3;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, instrument, trace, warn};

use crate::{
    components::{ConnectedComponentsProvider, FaceConnectedLabeling},
    control::{Control, Outcome},
    distance::{DistanceMapProvider, DistanceOptions, SeparableEdt},
    error::{Result, TopologyError},
    graph::UniformGridGraph,
    neighborhood::Neighborhood,
    queue::VoxelQueue,
    topology::{cc_invariant, euler_invariant},
    types::{Distance, Label, Spacing},
    volume::{Region, Volume},
};

/// Default priority drop of a voxel that is retried in the next round.
pub const DEFAULT_DELAY_DECREMENT: f32 = 0.5;

/// Parameters of [`carve_inside`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarveInsideParams<T> {
    /// Label of the region to carve.
    pub inside_value: T,
    /// Label written to every voxel that is not accepted.
    pub outside_value: T,
    /// Processed region. Must contain the bounding box of `inside_value`; the whole
    /// volume when `None`.
    pub region: Option<Region>,
    /// Priority drop of a delayed voxel. Must be strictly positive.
    pub delay_decrement: f32,
}

impl<T: Label> CarveInsideParams<T> {
    pub fn new(inside_value: T, outside_value: T) -> Self {
        Self {
            inside_value,
            outside_value,
            region: None,
            delay_decrement: DEFAULT_DELAY_DECREMENT,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_delay_decrement(mut self, delay_decrement: f32) -> Self {
        self.delay_decrement = delay_decrement;
        self
    }

    fn effective_decrement(&self) -> f32 {
        if self.delay_decrement.is_finite() && self.delay_decrement > 0.0 {
            self.delay_decrement
        } else {
            warn!(
                delay_decrement = self.delay_decrement,
                "delay decrement must be strictly positive, using {DEFAULT_DELAY_DECREMENT}"
            );
            DEFAULT_DELAY_DECREMENT
        }
    }
}

/// Carves `volume` with the built-in connected-component labeling and distance transform.
///
/// Every face-connected component of `inside_value` is regrown from its deepest
/// voxel, deepest first, accepting only voxels whose addition keeps the background
/// topology unchanged. A voxel that is not simple yet is retried in a later round
/// with a lower priority; the run stops after a round that accepts nothing.
///
/// Returns a volume holding `inside_value` on the accepted voxels and `outside_value`
/// everywhere else.
///
/// # Errors
///
/// [`TopologyError::PreconditionViolation`] if `params.region` does not contain the
/// bounding box of `inside_value`.
#[instrument(skip_all, fields(dims = ?volume.dims()))]
pub fn carve_inside<T: Label>(
    volume: &Volume<T>,
    params: &CarveInsideParams<T>,
) -> Result<Volume<T>> {
    let mut carver = InsideCarver::new(volume, params, &FaceConnectedLabeling, &SeparableEdt)?;
    carver.run(&mut Control::new());
    Ok(carver.finish())
}

/// [`carve_inside`] with explicit collaborators, cancellation and progress.
#[instrument(skip_all, fields(dims = ?volume.dims()))]
pub fn carve_inside_with<T, C, D>(
    volume: &Volume<T>,
    params: &CarveInsideParams<T>,
    components: &C,
    distance: &D,
    mut control: Control<'_>,
) -> Result<Outcome<T>>
where
    T: Label,
    C: ConnectedComponentsProvider,
    D: DistanceMapProvider,
{
    let mut carver = InsideCarver::new(volume, params, components, distance)?;
    let finished = carver.run(&mut control);
    Ok(control.resolve(finished, || carver.finish()))
}

/// Checks that the processed region covers every voxel labelled `inside_value`.
pub(crate) fn check_region<T: Label>(
    volume: &Volume<T>,
    region: Option<Region>,
    inside_value: T,
) -> Result<()> {
    let Some(region) = region else {
        return Ok(());
    };
    match volume.label_region(inside_value) {
        Some(label_region) if !region.is_inside(&label_region) => {
            Err(TopologyError::PreconditionViolation {
                region,
                label_region,
            })
        }
        _ => Ok(()),
    }
}

struct InsideCarver<T> {
    inside_value: T,
    outside_value: T,
    decrement: f32,
    graph: UniformGridGraph<3>,
    spacing: Spacing,
    inside: Array3<bool>,
    distance: Array3<Distance>,
    output: Array3<T>,
    visited: Array3<bool>,
    queue: VoxelQueue,
    enqueued: usize,
}

impl<T: Label> InsideCarver<T> {
    fn new<C, D>(
        volume: &Volume<T>,
        params: &CarveInsideParams<T>,
        components: &C,
        distance: &D,
    ) -> Result<Self>
    where
        C: ConnectedComponentsProvider,
        D: DistanceMapProvider,
    {
        check_region(volume, params.region, params.inside_value)?;

        let dims = volume.dims();
        let spacing = volume.spacing();
        let graph = UniformGridGraph::new(dims, [spacing[0], spacing[1], spacing[2]])?;
        let inside = volume.data().map(|&v| v == params.inside_value);
        let (labels, count) = components.label_components(&inside.view(), false)?;
        let distance = distance.distance_map(
            &inside.view(),
            false,
            &spacing,
            DistanceOptions::inside_positive_squared(),
        );

        let mut carver = Self {
            inside_value: params.inside_value,
            outside_value: params.outside_value,
            decrement: params.effective_decrement(),
            graph,
            spacing,
            inside,
            distance,
            output: Array3::from_elem(dims, params.outside_value),
            visited: Array3::from_elem(dims, false),
            queue: VoxelQueue::new(),
            enqueued: 0,
        };
        carver.seed(&labels, count);
        Ok(carver)
    }

    /// Places one seed per component at its deepest voxel (smallest flat index on ties).
    ///
    /// The scan is a plain reduction, so it runs in parallel; only the queue order
    /// that follows it is order-sensitive.
    fn seed(&mut self, labels: &Array3<u32>, count: usize) {
        let graph = &self.graph;
        let distance = &self.distance;
        let best = (0..graph.size())
            .into_par_iter()
            .filter_map(|flat| {
                let idx = graph.unflat(flat).map(|i| i as usize);
                let label = labels[idx] as usize;
                (label != 0).then(|| (label - 1, distance[idx], flat))
            })
            .fold(
                || vec![None; count],
                |mut best: Vec<Option<(Distance, usize)>>, (label, d, flat)| {
                    best[label] = deeper(best[label], Some((d, flat)));
                    best
                },
            )
            .reduce(
                || vec![None; count],
                |a, b| a.into_iter().zip(b).map(|(a, b)| deeper(a, b)).collect(),
            );

        for (d, flat) in best.into_iter().flatten() {
            let idx = self.index(flat);
            self.output[idx] = self.inside_value;
            self.visited[idx] = true;
            self.queue.push(d, flat);
            self.enqueued += 1;
        }
        debug!(components = count, seeds = self.queue.len(), "seeded");
    }

    fn index(&self, flat: usize) -> [usize; 3] {
        self.graph.unflat(flat).map(|i| i as usize)
    }

    /// A non-seed voxel is accepted when adding it keeps the local background
    /// topology: same Euler characteristic, same number of components.
    fn is_acceptable(&self, idx: [usize; 3]) -> bool {
        let center = idx.map(|i| i as isize);
        let hood = Neighborhood::gather(&self.output.view(), center, self.outside_value);
        euler_invariant(&hood, self.outside_value) && cc_invariant(&hood, self.outside_value)
    }

    /// Runs rounds until one accepts nothing. Returns `false` if cancelled.
    fn run(&mut self, control: &mut Control<'_>) -> bool {
        let mut visited = 0;
        let mut round = 0;
        loop {
            round += 1;
            let mut delayed = VoxelQueue::new();
            let mut carved = 0_usize;

            while let Some(node) = self.queue.pop() {
                if control.is_cancelled() {
                    debug!(round, visited, "cancelled");
                    return false;
                }
                visited += 1;

                let idx = self.index(node.index);
                if self.output[idx] == self.inside_value || self.is_acceptable(idx) {
                    self.output[idx] = self.inside_value;
                    carved += 1;
                } else {
                    trace!(?idx, priority = node.priority, "delayed");
                    delayed.push(node.priority - self.decrement, node.index);
                }

                let center = idx.map(|i| i as isize);
                for n in &self.graph.neighbors(&center) {
                    let n_idx = n.map(|i| i as usize);
                    if self.inside[n_idx] && !self.visited[n_idx] {
                        self.visited[n_idx] = true;
                        self.queue.push(self.distance[n_idx], self.graph.flat(n));
                        self.enqueued += 1;
                    }
                }
                control.tick(visited, self.enqueued);
            }

            control.report(visited, self.enqueued);
            debug!(round, carved, delayed = delayed.len(), "round finished");
            if carved == 0 {
                return true;
            }
            self.queue = delayed;
        }
    }

    fn finish(self) -> Volume<T> {
        Volume::from_parts(self.output, self.spacing)
    }
}

/// The deeper of two seed candidates; equal depths go to the smaller flat index.
fn deeper(
    a: Option<(Distance, usize)>,
    b: Option<(Distance, usize)>,
) -> Option<(Distance, usize)> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if y.0 > x.0 || (y.0 == x.0 && y.1 < x.1) {
                Some(y)
            } else {
                Some(x)
            }
        }
        (x, None) => x,
        (None, y) => y,
    }
}
