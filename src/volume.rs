use crate::enums::Orientation;
use crate::interpolator::Interpolator;
use crate::resampler::{ResampleError, Resampler, Shape, Spacing};
use crate::window::CtWindow;

use image::GrayImage;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VolumeError {
    #[error("Resampling failed: {0}")]
    Resample(#[from] ResampleError),
}

/// CT volume in Hounsfield units, indexed `(z, y, x)`, with its voxel spacing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Volume {
    pub data: Array3<f32>,
    /// Millimetres per voxel, `(z, y, x)`.
    pub spacing: Spacing,
}

impl Volume {
    pub fn new(data: Array3<f32>, spacing: Spacing) -> Self {
        Self { data, spacing }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> Shape {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut Array3<f32> {
        &mut self.data
    }

    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// Shape of this volume resampled to isotropic voxels of the finest
    /// spacing.
    pub fn isotropic_dim(&self) -> Shape {
        Interpolator::get_isotropic_dimensions(self.spacing, self.dim())
    }

    /// Resizes the volume to `target_shape`, stretching the spacing so that
    /// the physical extent is kept.
    pub fn resize(&self, resampler: &Resampler, target_shape: Shape) -> Result<Self, VolumeError> {
        let data = resampler.resize(self.data.view(), target_shape, None)?;
        let (d, h, w) = self.dim();
        let (z, y, x) = self.spacing;
        let spacing = (
            z * d as f32 / target_shape.0 as f32,
            y * h as f32 / target_shape.1 as f32,
            x * w as f32 / target_shape.2 as f32,
        );
        Ok(Self::new(data, spacing))
    }

    /// Resamples the volume to `new_spacing` and crops/pads it to
    /// `target_shape`.
    pub fn resample_to_spacing(
        &self,
        resampler: &Resampler,
        new_spacing: Spacing,
        target_shape: Shape,
    ) -> Result<Self, VolumeError> {
        debug!(from = ?self.spacing, to = ?new_spacing, ?target_shape, "resampling volume");
        let data =
            resampler.unify_spacing(self.data.view(), self.spacing, new_spacing, target_shape)?;
        Ok(Self::new(data, new_spacing))
    }

    /// Slice at `index` along `orientation`, `None` when out of range.
    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ArrayView2<'_, f32>> {
        if !self.is_valid_index(index, orientation) {
            return None;
        }
        let slice = match orientation {
            Orientation::Axial => self.data.slice(s![index, .., ..]),
            Orientation::Coronal => self.data.slice(s![.., index, ..]),
            Orientation::Sagittal => self.data.slice(s![.., .., index]),
        };
        Some(slice)
    }

    /// Renders the slice at `index` through `window` as an 8-bit image.
    pub fn get_image_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
        window: &CtWindow,
    ) -> Option<GrayImage> {
        let slice = self.get_slice_from_axis(index, orientation)?;
        Self::slice_to_image(&slice, window)
    }

    fn slice_to_image(slice: &ArrayView2<'_, f32>, window: &CtWindow) -> Option<GrayImage> {
        let (height, width) = slice.dim();
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .map(|&v| window.eval(v))
            .collect();
        GrayImage::from_raw(width as u32, height as u32, pixel_data)
    }

    fn is_valid_index(&self, index: usize, orientation: Orientation) -> bool {
        let (d, h, w) = self.dim();
        let max_index = match orientation {
            Orientation::Axial => d,
            Orientation::Coronal => h,
            Orientation::Sagittal => w,
        };
        index < max_index
    }
}
