//! # CT resample library
//!
//! This crate prepares CT scans for lung-nodule networks by bringing every
//! scan onto a common voxel grid. A [`Resampler`] zooms a 3D volume with a
//! B-spline of order 0 to 5, either to a target shape or by an explicit
//! resize factor (e.g. derived from voxel spacing), and then crops/pads the
//! interpolated volume symmetrically so that the result always has exactly the
//! requested shape, whatever rounding happened during interpolation.
//!
//! Volumes are `(z, y, x)` ordered [`ndarray`] arrays. Single-volume calls are
//! synchronous and touch no shared state; [`batch`] runs many of them in
//! parallel using rayon.
//!
//! Around the core the crate keeps a small amount of plumbing:
//!  - [`VolumeLoader`] reads a directory of axial DICOM slices into a
//!    [`Volume`] in Hounsfield units together with its spacing
//!  - [`Volume`] resamples itself to a new spacing and renders slices through
//!    a [`CtWindow`] for visual checks
//!
//! # Examples
//!
//! ## Cropping/padding to a fixed shape
//!
//! ```
//! # use ct_resample::{to_shape, PaddingMode};
//! # use ndarray::Array3;
//! let data = Array3::<f32>::zeros((11, 8, 6));
//! let out = to_shape(data.view(), (8, 8, 8), &PaddingMode::Edge).unwrap();
//! assert_eq!(out.dim(), (8, 8, 8));
//! ```
//!
//! ## Unifying spacing of a DICOM series
//!
//! ```no_run
//! # use ct_resample::{Resampler, SortBy, VolumeLoader};
//! # use std::path::PathBuf;
//! let volume = VolumeLoader::load_from_directory(&PathBuf::from("dicom"), SortBy::ImagePositionPatient)
//!     .expect("should have loaded files from directory");
//! let resampled = volume
//!     .resample_to_spacing(&Resampler::default(), (1.7, 1.0, 1.0), (92, 256, 256))
//!     .expect("should have resampled the volume");
//! assert_eq!(resampled.dim(), (92, 256, 256));
//! ```

pub mod batch;
pub mod enums;
mod interpolator;
pub mod resampler;
pub mod volume;
pub mod volume_loader;
pub mod window;

pub use batch::{resize_batch, resize_batch_into};
pub use enums::{Orientation, PaddingMode, SortBy};
pub use interpolator::MAX_SPLINE_ORDER;
pub use resampler::{
    AxisAdjustment, DEFAULT_SPLINE_ORDER, ResampleError, Resampler, ResizeFactor, ShapePlan,
    Shape, Spacing, resize_factor, to_shape,
};
pub use volume::{Volume, VolumeError};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
pub use window::CtWindow;
