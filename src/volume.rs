use ndarray::{Array3, ArrayD, ArrayView3, ArrayViewMut3, Ix3, s};

use crate::{
    error::{Result, TopologyError},
    types::{Label, Spacing, VoxelIndex},
};

/// Axis-aligned box of voxels: `size[d]` voxels starting at `index[d]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub index: VoxelIndex,
    pub size: [usize; 3],
}

impl Region {
    pub fn new(index: VoxelIndex, size: [usize; 3]) -> Self {
        Self { index, size }
    }

    /// The region covering a whole volume of the given dimensions.
    pub fn from_dims(dims: [usize; 3]) -> Self {
        Self {
            index: [0; 3],
            size: dims,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size.iter().any(|&n| n == 0)
    }

    /// Exclusive upper corner.
    pub fn upper(&self) -> VoxelIndex {
        [0, 1, 2].map(|d| self.index[d] + self.size[d] as isize)
    }

    pub fn contains_index(&self, idx: &VoxelIndex) -> bool {
        let upper = self.upper();
        (0..3).all(|d| idx[d] >= self.index[d] && idx[d] < upper[d])
    }

    /// Returns `true` if `other` lies entirely within `self`. An empty `other` is inside anything.
    pub fn is_inside(&self, other: &Region) -> bool {
        if other.is_empty() {
            return true;
        }
        let (upper, other_upper) = (self.upper(), other.upper());
        (0..3).all(|d| other.index[d] >= self.index[d] && other_upper[d] <= upper[d])
    }

    /// Grows the region by `radius` voxels on every side.
    pub fn pad(&self, radius: usize) -> Self {
        Self {
            index: self.index.map(|i| i - radius as isize),
            size: self.size.map(|n| n + 2 * radius),
        }
    }

    /// Intersection with `bounds`. The result is empty if they do not overlap.
    pub fn crop(&self, bounds: &Region) -> Self {
        let (upper, bounds_upper) = (self.upper(), bounds.upper());
        let index = [0, 1, 2].map(|d| self.index[d].max(bounds.index[d]));
        let size = [0, 1, 2].map(|d| (upper[d].min(bounds_upper[d]) - index[d]).max(0) as usize);
        Self { index, size }
    }
}

/// Read-only access to a labelled 3-D grid.
pub trait VolumeSource {
    type Label: Label;

    fn dims(&self) -> [usize; 3];

    fn spacing(&self) -> Spacing;

    /// The label at `idx`, or `None` when `idx` is outside the grid.
    fn get(&self, idx: VoxelIndex) -> Option<Self::Label>;

    /// Copies the labels into an owned array indexed `[x, y, z]`.
    fn to_array(&self) -> Result<Array3<Self::Label>> {
        use ndarray::ShapeBuilder;

        let dims = self.dims();
        let values = (0..dims[2])
            .flat_map(|z| (0..dims[1]).flat_map(move |y| (0..dims[0]).map(move |x| [x, y, z])))
            .map(|[x, y, z]| self.get([x as isize, y as isize, z as isize]))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TopologyError::InvalidDimensions {
                dims: dims.to_vec(),
            })?;
        Ok(Array3::from_shape_vec((dims[0], dims[1], dims[2]).f(), values)?)
    }
}

/// A labelled voxel grid with physical spacing.
///
/// Labels are indexed `[x, y, z]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    data: Array3<T>,
    spacing: Spacing,
}

impl<T: Label> Volume<T> {
    /// Wraps `data` with unit spacing.
    pub fn new(data: Array3<T>) -> Self {
        Self {
            data,
            spacing: Spacing::new(1.0, 1.0, 1.0),
        }
    }

    pub(crate) fn from_parts(data: Array3<T>, spacing: Spacing) -> Self {
        Self { data, spacing }
    }

    /// Creates a volume with every voxel set to `value`.
    pub fn from_elem(dims: [usize; 3], value: T) -> Self {
        Self::new(Array3::from_elem((dims[0], dims[1], dims[2]), value))
    }

    /// Fills the volume by evaluating `f` at every `[x, y, z]`.
    pub fn from_shape_fn<F>(dims: [usize; 3], mut f: F) -> Self
    where
        F: FnMut([usize; 3]) -> T,
    {
        Self::new(Array3::from_shape_fn((dims[0], dims[1], dims[2]), |(x, y, z)| {
            f([x, y, z])
        }))
    }

    /// Builds a volume from a flat buffer with x running fastest.
    pub fn from_vec(dims: [usize; 3], values: Vec<T>) -> Result<Self> {
        use ndarray::ShapeBuilder;

        let data = Array3::from_shape_vec((dims[0], dims[1], dims[2]).f(), values)?;
        Ok(Self::new(data))
    }

    /// Accepts an array of any rank; only rank 3 is supported.
    pub fn from_dyn(data: ArrayD<T>) -> Result<Self> {
        let dimensions = data.ndim();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| TopologyError::UnsupportedConfiguration { dimensions })?;
        Ok(Self::new(data))
    }

    /// Sets the physical voxel size.
    ///
    /// Returns [`TopologyError::InvalidSpacing`] for non-positive or non-finite values.
    pub fn with_spacing(mut self, spacing: Spacing) -> Result<Self> {
        if let Some(&bad) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(TopologyError::InvalidSpacing(bad));
        }
        self.spacing = spacing;
        Ok(self)
    }

    pub fn dims(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.data.dim();
        [nx, ny, nz]
    }

    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    pub fn region(&self) -> Region {
        Region::from_dims(self.dims())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, idx: VoxelIndex) -> Option<T> {
        let idx = to_usize(idx)?;
        self.data.get(idx).copied()
    }

    /// Writes `value` at `idx`. Returns `false` if `idx` is outside the grid.
    pub fn set(&mut self, idx: VoxelIndex, value: T) -> bool {
        match to_usize(idx).and_then(|idx| self.data.get_mut(idx)) {
            Some(v) => {
                *v = value;
                true
            }
            None => false,
        }
    }

    pub fn view(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, T> {
        self.data.view_mut()
    }

    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn into_data(self) -> Array3<T> {
        self.data
    }

    /// Applies `f` to every label, keeping the spacing.
    pub fn map<U: Label, F: FnMut(&T) -> U>(&self, f: F) -> Volume<U> {
        Volume {
            data: self.data.map(f),
            spacing: self.spacing,
        }
    }

    /// Tight bounding box of voxels equal to `label`, or `None` if there are none.
    pub fn label_region(&self, label: T) -> Option<Region> {
        self.selected_region(|&v| v == label)
    }

    /// Tight bounding box of voxels matching `is_selected`, or `None` if there are none.
    pub fn selected_region<P>(&self, mut is_selected: P) -> Option<Region>
    where
        P: FnMut(&T) -> bool,
    {
        let mut lower = [usize::MAX; 3];
        let mut upper = [0_usize; 3];
        let mut found = false;
        for ((x, y, z), v) in self.data.indexed_iter() {
            if is_selected(v) {
                found = true;
                for (d, i) in [x, y, z].into_iter().enumerate() {
                    lower[d] = lower[d].min(i);
                    upper[d] = upper[d].max(i);
                }
            }
        }
        found.then(|| Region {
            index: lower.map(|i| i as isize),
            size: [0, 1, 2].map(|d| upper[d] - lower[d] + 1),
        })
    }

    /// Copies the voxels of `region` into a new volume. `region` is cropped to the grid first.
    pub fn extract(&self, region: &Region) -> Volume<T> {
        let region = region.crop(&self.region());
        let [x0, y0, z0] = region.index.map(|i| i as usize);
        let [sx, sy, sz] = region.size;
        Volume {
            data: self
                .data
                .slice(s![x0..x0 + sx, y0..y0 + sy, z0..z0 + sz])
                .to_owned(),
            spacing: self.spacing,
        }
    }

    /// Writes `patch` into the voxels starting at `origin`, clipping whatever falls outside.
    pub fn paste(&mut self, origin: VoxelIndex, patch: &Volume<T>) {
        let target = Region::new(origin, patch.dims()).crop(&self.region());
        if target.is_empty() {
            return;
        }
        let [x0, y0, z0] = target.index.map(|i| i as usize);
        let [px, py, pz] = [0, 1, 2].map(|d| (target.index[d] - origin[d]) as usize);
        let [sx, sy, sz] = target.size;
        self.data
            .slice_mut(s![x0..x0 + sx, y0..y0 + sy, z0..z0 + sz])
            .assign(&patch.data.slice(s![px..px + sx, py..py + sy, pz..pz + sz]));
    }
}

impl<T: Label> VolumeSource for Volume<T> {
    type Label = T;

    fn dims(&self) -> [usize; 3] {
        Volume::dims(self)
    }

    fn spacing(&self) -> Spacing {
        self.spacing
    }

    fn get(&self, idx: VoxelIndex) -> Option<T> {
        Volume::get(self, idx)
    }

    fn to_array(&self) -> Result<Array3<T>> {
        Ok(self.data.clone())
    }
}

/// Converts a signed index to an ndarray index, or `None` if any component is negative.
#[inline]
pub(crate) fn to_usize(idx: VoxelIndex) -> Option<[usize; 3]> {
    Some([
        usize::try_from(idx[0]).ok()?,
        usize::try_from(idx[1]).ok()?,
        usize::try_from(idx[2]).ok()?,
    ])
}
