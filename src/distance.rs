use ndarray::{Array3, ArrayView3, Axis, Zip};

use crate::types::{Distance, Label, Spacing};

/// Sign and scale conventions for a distance map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceOptions {
    /// `true`: voxels of the object are positive, background negative. `false`: the reverse.
    pub inside_is_positive: bool,
    /// Return squared distances.
    pub squared: bool,
}

impl DistanceOptions {
    pub fn inside_positive_squared() -> Self {
        Self {
            inside_is_positive: true,
            squared: true,
        }
    }

    pub fn inside_negative() -> Self {
        Self {
            inside_is_positive: false,
            squared: false,
        }
    }
}

/// Computes signed distance maps of a binary object.
pub trait DistanceMapProvider {
    /// Distance of every voxel to the other class, in physical units.
    ///
    /// Voxels not equal to `background` form the object. Object voxels receive the
    /// distance to the nearest background voxel, background voxels the distance to
    /// the nearest object voxel, signed according to `options`.
    fn distance_map<T: Label>(
        &self,
        volume: &ArrayView3<'_, T>,
        background: T,
        spacing: &Spacing,
        options: DistanceOptions,
    ) -> Array3<Distance>;
}

/// Exact Euclidean distance transform, separable over the three axes.
///
/// Each axis pass computes the lower envelope of parabolas along every grid line
/// (Felzenszwalb & Huttenlocher). Lines are independent, so every pass runs in
/// parallel with Rayon.
///
/// A class with no voxels at all leaves the other class at [`Distance::MAX`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SeparableEdt;

impl DistanceMapProvider for SeparableEdt {
    fn distance_map<T: Label>(
        &self,
        volume: &ArrayView3<'_, T>,
        background: T,
        spacing: &Spacing,
        options: DistanceOptions,
    ) -> Array3<Distance> {
        let inside = volume.map(|&v| v != background);
        let to_inside = squared_edt(&inside.view(), spacing, true);
        let to_outside = squared_edt(&inside.view(), spacing, false);

        let sign = if options.inside_is_positive { 1.0 } else { -1.0 };
        let mut out = Array3::<Distance>::zeros(volume.dim());
        Zip::from(&mut out)
            .and(&inside)
            .and(&to_inside)
            .and(&to_outside)
            .par_for_each(|out, &is_inside, &d_in, &d_out| {
                let (d2, s) = if is_inside { (d_out, sign) } else { (d_in, -sign) };
                *out = if d2.is_finite() {
                    let d = if options.squared { d2 } else { d2.sqrt() };
                    (s * d) as Distance
                } else {
                    s as Distance * Distance::MAX
                };
            });
        out
    }
}

/// Squared distance of every voxel to the nearest voxel where `mask == target`.
fn squared_edt(mask: &ArrayView3<'_, bool>, spacing: &Spacing, target: bool) -> Array3<f64> {
    let mut dist = mask.map(|&m| if m == target { 0.0 } else { f64::INFINITY });
    for axis in 0..3 {
        let step = spacing[axis];
        Zip::from(dist.lanes_mut(Axis(axis))).par_for_each(|mut lane| {
            let line = lane.to_vec();
            let transformed = lower_envelope(&line, step);
            lane.iter_mut()
                .zip(transformed)
                .for_each(|(dst, src)| *dst = src);
        });
    }
    dist
}

/// One-dimensional squared distance transform of the sampled function `f`.
///
/// ```text
/// d(p) = min_q ( (x_p - x_q)² + f(q) ),   x_i = i * step
/// ```
///
/// Infinite samples are not sites; if every sample is infinite the line is returned as is.
fn lower_envelope(f: &[f64], step: f64) -> Vec<f64> {
    let pos = |i: usize| i as f64 * step;

    // Parabola apexes `v` and the boundaries `z` between consecutive parabolas.
    let mut v: Vec<usize> = Vec::with_capacity(f.len());
    let mut z: Vec<f64> = Vec::with_capacity(f.len() + 1);

    for q in (0..f.len()).filter(|&q| f[q].is_finite()) {
        let xq = pos(q);
        loop {
            let Some(&last) = v.last() else {
                v.push(q);
                z.push(f64::NEG_INFINITY);
                break;
            };
            let xv = pos(last);
            let s = ((f[q] + xq * xq) - (f[last] + xv * xv)) / (2.0 * (xq - xv));
            let z_last = z.last().copied().unwrap_or(f64::NEG_INFINITY);
            if s <= z_last && v.len() > 1 {
                v.pop();
                z.pop();
            } else {
                v.push(q);
                z.push(s);
                break;
            }
        }
    }

    if v.is_empty() {
        return f.to_vec();
    }

    let mut k = 0;
    (0..f.len())
        .map(|p| {
            let xp = pos(p);
            while k + 1 < v.len() && z[k + 1] < xp {
                k += 1;
            }
            let dx = xp - pos(v[k]);
            dx * dx + f[v[k]]
        })
        .collect()
}
