//! Resize-to-resolution and crop/pad shape normalization of CT volumes.
//!
//! Everything here works on `(z, y, x)` ordered volumes. A resize first zooms
//! the volume with a spline of the configured order and then, when the zoomed
//! shape does not match the requested one, crops or pads it symmetrically so
//! that the result always has exactly the requested shape.

use std::cmp::Ordering;
use std::ops::Range;

use ndarray::{Array3, ArrayView3, ArrayViewD, ArrayViewMut3, Ix3, s};
use thiserror::Error;
use tracing::{debug, trace};

use crate::enums::PaddingMode;
use crate::interpolator::{Interpolator, MAX_SPLINE_ORDER};

/// Volume shape as `(depth, height, width)`.
pub type Shape = (usize, usize, usize);

/// Per-axis scaling ratio, `(z, y, x)`.
pub type ResizeFactor = (f64, f64, f64);

/// Millimetres per voxel, `(z, y, x)`.
pub type Spacing = (f32, f32, f32);

/// Cubic splines, the usual choice for CT intensities.
pub const DEFAULT_SPLINE_ORDER: u8 = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResampleError {
    #[error("Expected a 3-dimensional volume, got {ndim} dimension(s)")]
    NotThreeDimensional { ndim: usize },

    #[error("Target shape must be positive on every axis, got {0:?}")]
    InvalidTargetShape(Shape),

    #[error("Resize factor must be finite and positive on every axis, got {0:?}")]
    InvalidResizeFactor(ResizeFactor),

    #[error("Spacing must be finite and positive on every axis, got {0:?}")]
    InvalidSpacing(Spacing),

    #[error("Spline order {0} is not supported (0..={max})", max = MAX_SPLINE_ORDER)]
    UnsupportedOrder(u8),

    #[error("Volume has no voxels")]
    EmptyVolume,

    #[error("Resize factor {factor:?} would produce a volume too large to address")]
    OutputTooLarge { factor: ResizeFactor },

    #[error("Expected {expected} entries in batch, got {actual}")]
    BatchLengthMismatch { expected: usize, actual: usize },
}

/// What shape normalization does to a single axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisAdjustment {
    NoChange,
    /// Remove `first` voxels from the start and `trailing` from the end.
    Crop { first: usize, trailing: usize },
    /// Add `first` voxels before the start and `trailing` after the end.
    Pad { first: usize, trailing: usize },
}

impl AxisAdjustment {
    /// Adjustment turning an axis of `data_dim` voxels into `target_dim`.
    ///
    /// Odd differences put the extra voxel at the trailing end.
    pub fn between(data_dim: usize, target_dim: usize) -> Self {
        match data_dim.cmp(&target_dim) {
            Ordering::Equal => AxisAdjustment::NoChange,
            Ordering::Greater => {
                let overshoot = data_dim - target_dim;
                let first = overshoot / 2;
                AxisAdjustment::Crop {
                    first,
                    trailing: overshoot - first,
                }
            }
            Ordering::Less => {
                let deficit = target_dim - data_dim;
                let first = deficit / 2;
                AxisAdjustment::Pad {
                    first,
                    trailing: deficit - first,
                }
            }
        }
    }

    /// Range of the axis kept by the crop pass.
    fn kept(&self, data_dim: usize) -> Range<usize> {
        match *self {
            AxisAdjustment::Crop { first, trailing } => first..data_dim - trailing,
            _ => 0..data_dim,
        }
    }

    /// `(before, after)` widths added by the pad pass.
    fn pad_widths(&self) -> (usize, usize) {
        match *self {
            AxisAdjustment::Pad { first, trailing } => (first, trailing),
            _ => (0, 0),
        }
    }
}

/// Per-axis crop/pad plan between two shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapePlan {
    pub axes: [AxisAdjustment; 3],
}

impl ShapePlan {
    pub fn new(data_shape: Shape, target: Shape) -> Self {
        Self {
            axes: [
                AxisAdjustment::between(data_shape.0, target.0),
                AxisAdjustment::between(data_shape.1, target.1),
                AxisAdjustment::between(data_shape.2, target.2),
            ],
        }
    }

    pub fn is_identity(&self) -> bool {
        self.axes.iter().all(|a| *a == AxisAdjustment::NoChange)
    }

    fn needs_padding(&self) -> bool {
        self.axes
            .iter()
            .any(|a| matches!(a, AxisAdjustment::Pad { .. }))
    }
}

fn validate_target_shape(shape: Shape) -> Result<(), ResampleError> {
    if [shape.0, shape.1, shape.2].contains(&0) {
        return Err(ResampleError::InvalidTargetShape(shape));
    }
    Ok(())
}

fn validate_spacing(spacing: Spacing) -> Result<(), ResampleError> {
    let (z, y, x) = spacing;
    if [z, y, x].iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(ResampleError::InvalidSpacing(spacing));
    }
    Ok(())
}

/// Resize factor mapping `source` onto `target`, axis by axis.
pub fn resize_factor(source: Shape, target: Shape) -> ResizeFactor {
    (
        target.0 as f64 / source.0 as f64,
        target.1 as f64 / source.1 as f64,
        target.2 as f64 / source.2 as f64,
    )
}

/// Crops and pads `data` symmetrically so that it has exactly `shape`.
///
/// Axes larger than the target are cropped, smaller ones padded using
/// `padding`; an axis already at its target size is left alone. The crop is a
/// single slice over all three axes, followed by a single padding pass.
///
/// # Errors
///
/// Returns [`ResampleError::InvalidTargetShape`] if any target entry is zero,
/// and [`ResampleError::EmptyVolume`] when an empty volume would have to be
/// padded with anything but a constant.
pub fn to_shape<A: Clone>(
    data: ArrayView3<'_, A>,
    shape: Shape,
    padding: &PaddingMode<A>,
) -> Result<Array3<A>, ResampleError> {
    validate_target_shape(shape)?;

    let data_shape = data.dim();
    let plan = ShapePlan::new(data_shape, shape);
    if plan.is_identity() {
        return Ok(data.to_owned());
    }
    trace!(?data_shape, ?shape, ?plan, "normalizing volume shape");

    let [z, y, x] = plan.axes;
    let cropped = data.slice(s![
        z.kept(data_shape.0),
        y.kept(data_shape.1),
        x.kept(data_shape.2)
    ]);

    if !plan.needs_padding() {
        return Ok(cropped.to_owned());
    }
    pad(cropped, &plan, shape, padding)
}

fn pad<A: Clone>(
    data: ArrayView3<'_, A>,
    plan: &ShapePlan,
    shape: Shape,
    padding: &PaddingMode<A>,
) -> Result<Array3<A>, ResampleError> {
    let (d, h, w) = data.dim();
    let [(z0, _), (y0, _), (x0, _)] = plan.axes.map(|a| a.pad_widths());

    if let PaddingMode::Constant(value) = padding {
        let mut out = Array3::from_elem(shape, value.clone());
        out.slice_mut(s![z0..z0 + d, y0..y0 + h, x0..x0 + w])
            .assign(&data);
        return Ok(out);
    }

    let source_indices = |before: usize, len: usize, target: usize| {
        (0..target)
            .map(|i| padding.source_index(i as isize - before as isize, len))
            .collect::<Option<Vec<_>>>()
            .ok_or(ResampleError::EmptyVolume)
    };
    let zi = source_indices(z0, d, shape.0)?;
    let yi = source_indices(y0, h, shape.1)?;
    let xi = source_indices(x0, w, shape.2)?;

    Ok(Array3::from_shape_fn(shape, |(i, j, k)| {
        data[[zi[i], yi[j], xi[k]]].clone()
    }))
}

/// Spline resampler with a fixed interpolation order and padding mode.
///
/// A `Resampler` holds no state besides its configuration, so one instance
/// can serve any number of volumes, from any number of threads.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resampler {
    order: u8,
    padding: PaddingMode<f32>,
}

impl Default for Resampler {
    fn default() -> Self {
        Self {
            order: DEFAULT_SPLINE_ORDER,
            padding: PaddingMode::Edge,
        }
    }
}

impl Resampler {
    pub fn new(order: u8, padding: PaddingMode<f32>) -> Result<Self, ResampleError> {
        if order > MAX_SPLINE_ORDER {
            return Err(ResampleError::UnsupportedOrder(order));
        }
        Ok(Self { order, padding })
    }

    /// Interpolation order: 0 is nearest neighbour, 1 linear, 3 cubic.
    pub fn with_order(mut self, order: u8) -> Self {
        self.order = order;
        self
    }

    /// Padding used when the interpolated volume is smaller than the target.
    pub fn with_padding(mut self, padding: PaddingMode<f32>) -> Self {
        self.padding = padding;
        self
    }

    pub fn order(&self) -> u8 {
        self.order
    }

    pub fn padding(&self) -> PaddingMode<f32> {
        self.padding
    }

    /// Resizes `source` to exactly `target_shape`.
    ///
    /// Without a `factor` the resize factor is `target_shape / source.dim()`,
    /// so interpolation already lands on the target. With an explicit
    /// `factor` the interpolated volume may miss the target by rounding or by
    /// design and is then cropped/padded into it. An axis the factor rounds
    /// to zero length is padded like any other, which only a constant padding
    /// can fill.
    ///
    /// # Errors
    ///
    /// Fails on a zero target entry, an empty source, a non-positive or
    /// oversized factor, or an unsupported order. Returns
    /// [`ResampleError::EmptyVolume`] when the zoom leaves nothing to pad from
    /// with a non-constant padding.
    pub fn resize(
        &self,
        source: ArrayView3<'_, f32>,
        target_shape: Shape,
        factor: Option<ResizeFactor>,
    ) -> Result<Array3<f32>, ResampleError> {
        validate_target_shape(target_shape)?;
        if source.is_empty() {
            return Err(ResampleError::EmptyVolume);
        }

        let source_shape = source.dim();
        let explicit = factor.is_some();
        let factor = factor.unwrap_or_else(|| resize_factor(source_shape, target_shape));

        let zoomed = Interpolator::zoom(source, factor, self.order)?;
        let zoomed_shape = zoomed.dim();
        debug!(
            ?source_shape,
            ?factor,
            explicit,
            ?zoomed_shape,
            ?target_shape,
            order = self.order,
            "resized volume"
        );

        if zoomed_shape == target_shape {
            return Ok(zoomed);
        }
        debug!(?zoomed_shape, ?target_shape, "cropping/padding to target shape");
        to_shape(zoomed.view(), target_shape, &self.padding)
    }

    /// Resizes `source` into `destination`, whose shape is the target shape.
    ///
    /// `accumulator` is handed back untouched next to the realized shape, so
    /// batch code can thread its own bookkeeping through per-volume calls.
    /// On error `destination` is left unchanged.
    pub fn resize_into<R>(
        &self,
        source: ArrayView3<'_, f32>,
        mut destination: ArrayViewMut3<'_, f32>,
        factor: Option<ResizeFactor>,
        accumulator: R,
    ) -> Result<(R, Shape), ResampleError> {
        let target_shape = destination.dim();
        let resized = self.resize(source, target_shape, factor)?;
        destination.assign(&resized);
        Ok((accumulator, target_shape))
    }

    /// [`Resampler::resize`] for arrays whose dimensionality is only known at
    /// runtime.
    pub fn resize_dyn(
        &self,
        source: ArrayViewD<'_, f32>,
        target_shape: Shape,
        factor: Option<ResizeFactor>,
    ) -> Result<Array3<f32>, ResampleError> {
        let ndim = source.ndim();
        let source = source
            .into_dimensionality::<Ix3>()
            .map_err(|_| ResampleError::NotThreeDimensional { ndim })?;
        self.resize(source, target_shape, factor)
    }

    /// Resamples `source` from `spacing` to `new_spacing` millimetres per
    /// voxel, then crops/pads the result to `target_shape`.
    pub fn unify_spacing(
        &self,
        source: ArrayView3<'_, f32>,
        spacing: Spacing,
        new_spacing: Spacing,
        target_shape: Shape,
    ) -> Result<Array3<f32>, ResampleError> {
        validate_spacing(spacing)?;
        validate_spacing(new_spacing)?;
        let factor = (
            f64::from(spacing.0) / f64::from(new_spacing.0),
            f64::from(spacing.1) / f64::from(new_spacing.1),
            f64::from(spacing.2) / f64::from(new_spacing.2),
        );
        debug!(?spacing, ?new_spacing, ?factor, "unifying spacing");
        self.resize(source, target_shape, Some(factor))
    }
}
