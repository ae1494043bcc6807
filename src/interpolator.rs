use ndarray::{Array3, ArrayView1, ArrayView3, ArrayViewMut1, Axis, Zip};

use crate::enums::reflect_index;
use crate::resampler::{ResampleError, ResizeFactor, Shape, Spacing};
use tracing::trace;

/// Highest supported spline order.
pub const MAX_SPLINE_ORDER: u8 = 5;

/// Most voxels a zoom may produce, bounded by what an `f64` buffer can index.
const MAX_VOXELS: f64 = (isize::MAX as usize / std::mem::size_of::<f64>()) as f64;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Shape the volume would have with every voxel as small as the finest
    /// spacing. Both `spacing` and `original_dim` are `(z, y, x)`.
    pub(crate) fn get_isotropic_dimensions(spacing: Spacing, original_dim: Shape) -> Shape {
        let (z_spacing, y_spacing, x_spacing) = spacing;
        let min_spacing = x_spacing.min(y_spacing).min(z_spacing);
        let inv_min_spacing = 1.0 / min_spacing;

        let new_z = (original_dim.0 as f32 * z_spacing * inv_min_spacing).round() as usize;
        let new_y = (original_dim.1 as f32 * y_spacing * inv_min_spacing).round() as usize;
        let new_x = (original_dim.2 as f32 * x_spacing * inv_min_spacing).round() as usize;

        (new_z, new_y, new_x)
    }

    /// Shape of `shape` after zooming by `factor`, every axis rounded half to
    /// even.
    ///
    /// Axes may round to zero. Zooms whose output or intermediate volumes
    /// could not be addressed are rejected with
    /// [`ResampleError::OutputTooLarge`].
    pub(crate) fn zoomed_shape(
        shape: Shape,
        factor: ResizeFactor,
    ) -> Result<Shape, ResampleError> {
        let axes = [(shape.0, factor.0), (shape.1, factor.1), (shape.2, factor.2)];
        let lens = axes.map(|(len, f)| (len as f64 * f).round_ties_even());
        // axes are zoomed one at a time, so every axis may be at its larger size
        let voxels: f64 = axes
            .iter()
            .zip(lens)
            .map(|(&(len, _), out)| (len as f64).max(out))
            .filter(|&len| len > 0.0)
            .product();
        if voxels > MAX_VOXELS {
            return Err(ResampleError::OutputTooLarge { factor });
        }
        Ok((lens[0] as usize, lens[1] as usize, lens[2] as usize))
    }

    /// Spline zoom of a volume by `factor` with a spline of the given `order`.
    ///
    /// Output samples are corner aligned: the first and last voxel of every
    /// axis land exactly on the first and last input voxel. Samples are taken
    /// from a mirror-symmetric extension of the input. An axis that rounds to
    /// zero length yields an empty volume.
    pub(crate) fn zoom(
        input: ArrayView3<'_, f32>,
        factor: ResizeFactor,
        order: u8,
    ) -> Result<Array3<f32>, ResampleError> {
        if order > MAX_SPLINE_ORDER {
            return Err(ResampleError::UnsupportedOrder(order));
        }
        let (f0, f1, f2) = factor;
        if [f0, f1, f2].iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(ResampleError::InvalidResizeFactor(factor));
        }
        if input.is_empty() {
            return Err(ResampleError::EmptyVolume);
        }

        let out_shape = Self::zoomed_shape(input.dim(), factor)?;
        if [out_shape.0, out_shape.1, out_shape.2].contains(&0) {
            trace!(?out_shape, "zoom rounds an axis to zero length");
            return Ok(Array3::zeros(out_shape));
        }

        let mut data = input.mapv(f64::from);
        for (axis, out_len) in [out_shape.0, out_shape.1, out_shape.2].into_iter().enumerate() {
            data = Self::zoom_axis(data, Axis(axis), out_len, order);
        }

        Ok(data.mapv(|v| v as f32))
    }

    fn zoom_axis(mut data: Array3<f64>, axis: Axis, out_len: usize, order: u8) -> Array3<f64> {
        let in_len = data.len_of(axis);
        if in_len == out_len {
            return data;
        }

        if order > 1 {
            let prefilter = Prefilter::new(order, in_len);
            for mut lane in data.lanes_mut(axis) {
                prefilter.apply(&mut lane);
            }
        }

        let kernel = AxisKernel::new(in_len, out_len, order);
        let mut out_dim = data.raw_dim();
        out_dim[axis.index()] = out_len;
        let mut out = Array3::<f64>::zeros(out_dim);

        Zip::from(out.lanes_mut(axis))
            .and(data.lanes(axis))
            .for_each(|mut dst, src| kernel.apply(&src, &mut dst));

        out
    }

    /// Centered B-spline basis function of degree `order` (0..=5).
    #[inline]
    pub(crate) fn bspline(order: u8, x: f64) -> f64 {
        let t = x.abs();
        match order {
            0 => {
                if (-0.5..0.5).contains(&x) {
                    1.0
                } else {
                    0.0
                }
            }
            1 => (1.0 - t).max(0.0),
            2 => {
                if t < 0.5 {
                    0.75 - t * t
                } else if t < 1.5 {
                    let u = 1.5 - t;
                    0.5 * u * u
                } else {
                    0.0
                }
            }
            3 => {
                if t < 1.0 {
                    2.0 / 3.0 - t * t + 0.5 * t * t * t
                } else if t < 2.0 {
                    let u = 2.0 - t;
                    u * u * u / 6.0
                } else {
                    0.0
                }
            }
            4 => {
                let t2 = t * t;
                if t < 0.5 {
                    (115.0 - 120.0 * t2 + 48.0 * t2 * t2) / 192.0
                } else if t < 1.5 {
                    (55.0 + 20.0 * t - 120.0 * t2 + 80.0 * t2 * t - 16.0 * t2 * t2) / 96.0
                } else if t < 2.5 {
                    let u = 5.0 - 2.0 * t;
                    u * u * u * u / 384.0
                } else {
                    0.0
                }
            }
            _ => {
                let t2 = t * t;
                let t4 = t2 * t2;
                if t < 1.0 {
                    (66.0 - 60.0 * t2 + 30.0 * t4 - 10.0 * t4 * t) / 120.0
                } else if t < 2.0 {
                    (51.0 + 75.0 * t - 210.0 * t2 + 150.0 * t2 * t - 45.0 * t4 + 5.0 * t4 * t)
                        / 120.0
                } else if t < 3.0 {
                    let u = 3.0 - t;
                    u * u * u * u * u / 120.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Poles of the recursive filter turning samples into B-spline
    /// coefficients of the given order.
    pub(crate) fn poles(order: u8) -> Vec<f64> {
        match order {
            2 => vec![8f64.sqrt() - 3.0],
            3 => vec![3f64.sqrt() - 2.0],
            4 => vec![
                (664.0 - 438976f64.sqrt()).sqrt() + 304f64.sqrt() - 19.0,
                (664.0 + 438976f64.sqrt()).sqrt() - 304f64.sqrt() - 19.0,
            ],
            5 => vec![
                (135.0 / 2.0 - (17745.0f64 / 4.0).sqrt()).sqrt() + (105.0f64 / 4.0).sqrt() - 6.5,
                (135.0 / 2.0 + (17745.0f64 / 4.0).sqrt()).sqrt() - (105.0f64 / 4.0).sqrt() - 6.5,
            ],
            _ => Vec::new(),
        }
    }
}

/// Causal/anti-causal recursive filter for one axis length, mirror boundary.
struct Prefilter {
    gain: f64,
    poles: Vec<Pole>,
}

struct Pole {
    z: f64,
    /// Weights of the exact mirror-boundary causal initialization.
    causal_init: Vec<f64>,
}

impl Prefilter {
    fn new(order: u8, len: usize) -> Self {
        let zs = Interpolator::poles(order);
        let gain = zs.iter().map(|&z| (1.0 - z) * (1.0 - 1.0 / z)).product();
        let poles = zs
            .into_iter()
            .map(|z| Pole {
                z,
                causal_init: Self::causal_weights(z, len),
            })
            .collect();
        Self { gain, poles }
    }

    /// `c[0] = sum_k w[k] * s[k]` over the mirrored signal of period `2n - 2`.
    fn causal_weights(z: f64, len: usize) -> Vec<f64> {
        if len < 2 {
            return vec![1.0];
        }
        let span = 2 * (len as i32 - 1);
        let norm = 1.0 - z.powi(span);
        (0..len)
            .map(|k| {
                let k = k as i32;
                let w = if k == 0 || k == len as i32 - 1 {
                    z.powi(k)
                } else {
                    z.powi(k) + z.powi(span - k)
                };
                w / norm
            })
            .collect()
    }

    fn apply(&self, lane: &mut ArrayViewMut1<'_, f64>) {
        let n = lane.len();
        if n < 2 {
            return;
        }
        lane.mapv_inplace(|v| v * self.gain);

        for pole in &self.poles {
            let z = pole.z;
            let first: f64 = pole
                .causal_init
                .iter()
                .zip(lane.iter())
                .map(|(w, v)| w * v)
                .sum();
            lane[0] = first;
            for k in 1..n {
                let prev = lane[k - 1];
                lane[k] += z * prev;
            }

            lane[n - 1] = (z / (z * z - 1.0)) * (lane[n - 1] + z * lane[n - 2]);
            for k in (0..n - 1).rev() {
                let next = lane[k + 1];
                lane[k] = z * (next - lane[k]);
            }
        }
    }
}

/// Precomputed taps for resampling one axis from `in_len` to `out_len`.
struct AxisKernel {
    taps: usize,
    indices: Vec<usize>,
    weights: Vec<f64>,
}

impl AxisKernel {
    fn new(in_len: usize, out_len: usize, order: u8) -> Self {
        let taps = order as usize + 1;
        let scale = if out_len > 1 {
            (in_len as f64 - 1.0) / (out_len as f64 - 1.0)
        } else {
            1.0
        };
        let max_coord = (in_len - 1) as f64;
        let half = (order / 2) as isize;

        let mut indices = Vec::with_capacity(out_len * taps);
        let mut weights = Vec::with_capacity(out_len * taps);
        for i in 0..out_len {
            let x = (i as f64 * scale).min(max_coord);
            let start = if order % 2 == 1 {
                x.floor() as isize - half
            } else {
                (x + 0.5).floor() as isize - half
            };
            for k in 0..taps as isize {
                let knot = start + k;
                indices.push(reflect_index(knot, in_len));
                weights.push(Interpolator::bspline(order, x - knot as f64));
            }
        }

        Self {
            taps,
            indices,
            weights,
        }
    }

    fn apply(&self, src: &ArrayView1<'_, f64>, dst: &mut ArrayViewMut1<'_, f64>) {
        let rows = self
            .indices
            .chunks_exact(self.taps)
            .zip(self.weights.chunks_exact(self.taps));
        for (out, (indices, weights)) in dst.iter_mut().zip(rows) {
            *out = indices
                .iter()
                .zip(weights)
                .map(|(&idx, &w)| w * src[idx])
                .sum();
        }
    }
}
