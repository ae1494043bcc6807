use crate::{enums::SortBy, resampler::Spacing, volume::Volume};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use std::{fs, path::Path};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

/// One decoded slice with the keys used to order and space it.
struct SliceRecord {
    order: Option<f32>,
    position_z: Option<f32>,
    image: Array2<f32>,
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a CT volume from DICOM objects
    ///
    /// Pixel values go through the modality LUT only, so CT volumes come out
    /// in Hounsfield units. The slice spacing is taken from the distance
    /// between the first two slice positions, falling back to Slice Thickness.
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found, dimensions are inconsistent or
    /// no spacing can be determined
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let mut records: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_record(dicom_object, sort_by))
            .collect();

        if records.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        if records.len() < dicom_objects.len() {
            warn!(
                skipped = dicom_objects.len() - records.len(),
                "skipped DICOM objects without decodable pixel data"
            );
        }

        Self::sort_records(&mut records, sort_by);
        Self::validate_dimensions(&records)?;

        let spacing = Self::get_spacing(dicom_objects, &records)?;
        let volume_array = Self::build_volume_array(&records);
        info!(dim = ?volume_array.dim(), ?spacing, "loaded CT volume");

        Ok(Volume::new(volume_array, spacing))
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        debug!(files = paths.len(), dir = %path.as_ref().display(), "reading DICOM series");

        Self::load_from_file_paths(&paths, sort_by)
    }

    fn extract_record(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<SliceRecord> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image = Self::decode_image(dicom_object)?;
        Some(SliceRecord {
            order,
            position_z: Self::position_z(dicom_object),
            image,
        })
    }

    fn position_z(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<f32> {
        dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float32()
            .ok()?
            .get(2)
            .copied()
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                dicom_object.element(tags::IMAGE_POSITION_PATIENT).ok()?;
                Some(Self::position_z(dicom_object))
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<f32>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
        pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_records(records: &mut [SliceRecord], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            records.sort_by(|a, b| {
                a.order
                    .partial_cmp(&b.order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        // head first: highest position at slice 0
        if matches!(sort_by, SortBy::ImagePositionPatient) {
            records.reverse();
        }
    }

    fn validate_dimensions(records: &[SliceRecord]) -> Result<(), VolumeLoaderError> {
        let first_dim = records[0].image.dim();
        if records.iter().any(|record| record.image.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(records: &[SliceRecord]) -> Array3<f32> {
        let (height, width) = records[0].image.dim();
        let depth = records.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, record) in records.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(&record.image);
        }

        volume
    }

    /// Spacing as `(z, y, x)` in millimetres.
    fn get_spacing(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        records: &[SliceRecord],
    ) -> Result<Spacing, VolumeLoaderError> {
        let (row_spacing, column_spacing) = dicom_objects
            .iter()
            .find_map(|dicom_object| {
                let pixel_spacing = dicom_object
                    .element(tags::PIXEL_SPACING)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some((*pixel_spacing.first()?, *pixel_spacing.get(1)?))
            })
            .ok_or(VolumeLoaderError::MissingSpacing)?;

        let slice_spacing = Self::slice_spacing_from_positions(records)
            .or_else(|| {
                dicom_objects.iter().find_map(|dicom_object| {
                    dicom_object
                        .element(tags::SLICE_THICKNESS)
                        .ok()?
                        .to_float32()
                        .ok()
                })
            })
            .ok_or(VolumeLoaderError::MissingSpacing)?;

        Ok((slice_spacing, row_spacing, column_spacing))
    }

    fn slice_spacing_from_positions(records: &[SliceRecord]) -> Option<f32> {
        let first = records.first()?.position_z?;
        let second = records.get(1)?.position_z?;
        let spacing = (first - second).abs();
        (spacing > 0.0).then_some(spacing)
    }
}
