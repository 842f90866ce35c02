use crate::enums::{SortBy, SourceType};
use crate::volume::{Volume, VolumeError};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use log::{debug, info, warn};
use ndarray::{Array2, Array3, Zip, s};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Intensity multiplier applied to NIfTI samples before clipping to `u8`.
pub const DEFAULT_CONTRAST_FACTOR: f32 = 0.3;

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

    #[error("Meta-information error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::error::NiftiError),

    #[error("Expected a 3D NIfTI volume, got shape {0:?}")]
    UnsupportedNiftiShape(Vec<usize>),

    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),
}

/// Sidecar metadata written next to a raw voxel buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMeta {
    #[serde(alias = "dimensions")]
    pub dims: [usize; 3],
    pub spacing: [f64; 3],
    #[serde(default)]
    pub origin: [f64; 3],
}

impl From<&Volume> for VolumeMeta {
    fn from(volume: &Volume) -> Self {
        Self {
            dims: volume.dimensions(),
            spacing: volume.spacing(),
            origin: volume.origin(),
        }
    }
}

/// A fetched volume before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDescriptor {
    pub data: Vec<u8>,
    pub dimensions: [usize; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    pub source_type: SourceType,
}

impl TryFrom<VolumeDescriptor> for Volume {
    type Error = VolumeError;

    fn try_from(descriptor: VolumeDescriptor) -> Result<Self, Self::Error> {
        Volume::new(
            descriptor.data,
            descriptor.dimensions,
            descriptor.spacing,
            descriptor.origin,
            descriptor.source_type,
        )
    }
}

struct DicomSlice {
    order: Option<f32>,
    position: Option<[f64; 3]>,
    pixels: Array2<u16>,
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Build a volume from meta JSON and the raw `u8` buffer it describes.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the buffer does not match
    /// the dimensions.
    pub fn load_from_parts(
        meta_json: &str,
        data: Vec<u8>,
        source_type: SourceType,
    ) -> Result<Volume, VolumeLoaderError> {
        let meta: VolumeMeta = serde_json::from_str(meta_json)?;
        let descriptor = VolumeDescriptor {
            data,
            dimensions: meta.dims,
            spacing: meta.spacing,
            origin: meta.origin,
            source_type,
        };
        let volume = Volume::try_from(descriptor)?;
        info!(
            "event=volume_load source={source_type} dims={:?} spacing={:?} origin={:?}",
            meta.dims, meta.spacing, meta.origin
        );
        Ok(volume)
    }

    /// Load a volume from a `.json` meta file and a `.bin` voxel file
    pub fn load_from_files(
        meta_path: impl AsRef<Path>,
        bin_path: impl AsRef<Path>,
        source_type: SourceType,
    ) -> Result<Volume, VolumeLoaderError> {
        let meta_json = fs::read_to_string(meta_path.as_ref())?;
        let data = fs::read(bin_path.as_ref())?;
        Self::load_from_parts(&meta_json, data, source_type)
    }

    /// Write the raw buffer and its meta JSON, creating parent directories.
    pub fn write_to_files(
        volume: &Volume,
        meta_path: impl AsRef<Path>,
        bin_path: impl AsRef<Path>,
    ) -> Result<(), VolumeLoaderError> {
        for path in [meta_path.as_ref(), bin_path.as_ref()] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(bin_path.as_ref(), volume.as_slice())?;
        fs::write(
            meta_path.as_ref(),
            serde_json::to_string(&VolumeMeta::from(volume))?,
        )?;
        info!(
            "event=volume_write bin={} meta={} voxels={}",
            bin_path.as_ref().display(),
            meta_path.as_ref().display(),
            volume.len()
        );
        Ok(())
    }

    /// Write `volume` and, for `preview_step > 1`, a downsampled copy beside it.
    ///
    /// The preview pair is named after the full-resolution one with a
    /// `_preview` suffix (`volume.bin` -> `volume_preview.bin`,
    /// `volume_base.meta.json` -> `volume_base.meta_preview.json`).
    pub fn write_with_preview(
        volume: &Volume,
        meta_path: impl AsRef<Path>,
        bin_path: impl AsRef<Path>,
        preview_step: usize,
    ) -> Result<(), VolumeLoaderError> {
        Self::write_to_files(volume, meta_path.as_ref(), bin_path.as_ref())?;
        if preview_step > 1 {
            let preview = volume.preview(preview_step)?;
            Self::write_to_files(
                &preview,
                preview_path(meta_path.as_ref()),
                preview_path(bin_path.as_ref()),
            )?;
        }
        Ok(())
    }

    /// Load a NIfTI volume (`.nii` or `.nii.gz`).
    ///
    /// Samples are multiplied by `contrast_factor` and clipped to `0..=255`.
    /// The file's axes are stored in reverse, so its last axis becomes the
    /// fastest-varying x; dimensions, spacing and origin follow that order.
    pub fn load_from_nifti(
        path: impl AsRef<Path>,
        contrast_factor: f32,
    ) -> Result<Volume, VolumeLoaderError> {
        let (header, values) = Self::read_nifti(path.as_ref())?;
        let data = values.mapv(|value| (value * contrast_factor).clamp(0.0, 255.0) as u8);
        let volume = Volume::from_array(
            data,
            nifti_spacing(&header),
            nifti_origin(&header),
            SourceType::Nifti,
        )?;
        info!(
            "event=nifti_load path={} dims={:?} spacing={:?} contrast={contrast_factor}",
            path.as_ref().display(),
            volume.dimensions(),
            volume.spacing()
        );
        Ok(volume)
    }

    /// Load a binary segmentation from NIfTI as a `0`/`255` mask.
    ///
    /// Label `1` becomes `255`, everything else `0`. With a `reference`, the
    /// mask is resampled (nearest neighbour) onto the reference grid and takes
    /// its spacing and origin, so it can be overlaid on that volume.
    pub fn load_segmentation_from_nifti(
        path: impl AsRef<Path>,
        reference: Option<&VolumeMeta>,
    ) -> Result<Volume, VolumeLoaderError> {
        let (header, labels) = Self::read_nifti(path.as_ref())?;
        let mask = labels.mapv(|label| if label == 1.0 { u8::MAX } else { 0 });
        let volume = match reference {
            Some(meta) => {
                let [nx, ny, nz] = meta.dims;
                if mask.dim() != (nz, ny, nx) {
                    debug!(
                        "event=segmentation_resample from={:?} to={:?}",
                        mask.dim(),
                        (nz, ny, nx)
                    );
                }
                let mask = resample_nearest(&mask, (nz, ny, nx));
                Volume::from_array(mask, meta.spacing, meta.origin, SourceType::Nifti)?
            }
            None => Volume::from_array(
                mask,
                nifti_spacing(&header),
                nifti_origin(&header),
                SourceType::Nifti,
            )?,
        };
        info!(
            "event=segmentation_load path={} dims={:?}",
            path.as_ref().display(),
            volume.dimensions()
        );
        Ok(volume)
    }

    /// Load the sidecar metadata of a written volume.
    pub fn read_meta(meta_path: impl AsRef<Path>) -> Result<VolumeMeta, VolumeLoaderError> {
        let meta_json = fs::read_to_string(meta_path.as_ref())?;
        Ok(serde_json::from_str(&meta_json)?)
    }

    // values in the file's own axis order; trailing singleton axes are dropped
    fn read_nifti(path: &Path) -> Result<(NiftiHeader, Array3<f32>), VolumeLoaderError> {
        let object = ReaderOptions::new().read_file(path)?;
        let header = object.header().clone();
        let values = object.into_volume().into_ndarray::<f32>()?;
        let shape = values.shape().to_vec();
        let dim = match shape.as_slice() {
            [x, y, z] => (*x, *y, *z),
            [x, y, z, rest @ ..] if rest.iter().all(|&n| n == 1) => (*x, *y, *z),
            _ => return Err(VolumeLoaderError::UnsupportedNiftiShape(shape.clone())),
        };
        let values = Array3::from_shape_vec(dim, values.iter().copied().collect())
            .map_err(|_| VolumeLoaderError::UnsupportedNiftiShape(shape))?;
        Ok((header, values))
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let mut slices: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_slice(dicom_object, sort_by))
            .collect();

        if slices.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_slices(&mut slices, sort_by);
        Self::validate_dimensions(&slices)?;

        let mut spacing =
            Self::get_spacing(dicom_objects).ok_or(VolumeLoaderError::MissingSpacing)?;
        if let Some(step) = Self::slice_step(&slices) {
            spacing[2] = step;
        }
        // slice 0 sits at the origin and the stack grows along +z
        let origin = slices[0].position.unwrap_or_else(|| {
            warn!("event=dicom_origin_missing fallback=zero");
            [0.0; 3]
        });
        let data = Self::build_volume_array(&slices);
        debug!(
            "event=dicom_stack slices={} shape={:?}",
            slices.len(),
            data.dim()
        );

        Ok(Volume::from_array(data, spacing, origin, SourceType::Dicom)?)
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

        info!(
            "event=dicom_scan dir={} files={}",
            path.as_ref().display(),
            paths.len()
        );
        Self::load_from_file_paths(&paths, sort_by)
    }

    fn extract_slice(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<DicomSlice> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let pixels = Self::decode_image(dicom_object)?;
        Some(DicomSlice {
            order,
            position: Self::get_position(dicom_object),
            pixels,
        })
    }

    fn get_position(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<[f64; 3]> {
        let pos = dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float32()
            .ok()?;
        match pos.as_slice() {
            [x, y, z, ..] => Some([*x as f64, *y as f64, *z as f64]),
            _ => None,
        }
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => Some(
                dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok(),
            ),
            SortBy::InstanceNumber => Some(
                dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32),
            ),
            SortBy::None => Some(Some(0.0)),
        }
    }

    // first frame, first sample of each pixel
    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<u16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    // ascending, so the lowest slice comes first
    fn sort_slices(slices: &mut [DicomSlice], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            slices.sort_by(|a, b| {
                a.order
                    .partial_cmp(&b.order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    // distance between the first two slice positions; overrides Slice
    // Thickness, which need not match the spacing of the series
    fn slice_step(slices: &[DicomSlice]) -> Option<f64> {
        let [first, second, ..] = slices else {
            return None;
        };
        let (a, b) = (first.position?, second.position?);
        let step = (0..3).map(|d| (b[d] - a[d]).powi(2)).sum::<f64>().sqrt();
        (step > 0.0).then_some(step)
    }

    fn validate_dimensions(slices: &[DicomSlice]) -> Result<(), VolumeLoaderError> {
        let first_dim = slices[0].pixels.dim();
        if slices.iter().any(|slice| slice.pixels.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(slices: &[DicomSlice]) -> Array3<u8> {
        let (height, width) = slices[0].pixels.dim();
        let mut volume = Array3::<u8>::zeros((slices.len(), height, width));

        for (i, slice) in slices.iter().enumerate() {
            Zip::from(volume.slice_mut(s![i, .., ..]))
                .and(&slice.pixels)
                .par_for_each(|out, &value| *out = Self::normalize_to_u8(value));
        }

        volume
    }

    #[inline]
    fn normalize_to_u8(value: u16) -> u8 {
        ((value as f32 / 65535.0) * 255.0).clamp(0.0, 255.0) as u8
    }

    // Pixel Spacing is (row spacing, column spacing), i.e. (y, x)
    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<[f64; 3]> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float32()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float32()
                .ok()?;

            Some([
                *pixel_spacing.get(1)? as f64,
                *pixel_spacing.first()? as f64,
                slice_thickness as f64,
            ])
        })
    }
}

// `name.ext` -> `name_preview.ext`
fn preview_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_preview.{ext}"),
        None => format!("{stem}_preview"),
    };
    path.with_file_name(name)
}

// pixdim is (x, y, z) in file order; stored axes are reversed
fn nifti_spacing(header: &NiftiHeader) -> [f64; 3] {
    [header.pixdim[3], header.pixdim[2], header.pixdim[1]].map(|s| f64::from(s.abs()))
}

/// Translation part of the file's best affine (sform, then qform), reversed
/// into stored axis order. Zero when neither transform is set.
fn nifti_origin(header: &NiftiHeader) -> [f64; 3] {
    let [x, y, z] = if header.sform_code > 0 && header.sform_code >= header.qform_code {
        [header.srow_x[3], header.srow_y[3], header.srow_z[3]]
    } else if header.qform_code > 0 {
        [header.quatern_x, header.quatern_y, header.quatern_z]
    } else {
        [0.0; 3]
    };
    [z, y, x].map(f64::from)
}

/// Nearest-neighbour resampling onto `shape`, matching corner samples.
///
/// Output index `o` reads input index `round(o * (n_in - 1) / (n_out - 1))`.
fn resample_nearest(data: &Array3<u8>, shape: (usize, usize, usize)) -> Array3<u8> {
    if data.dim() == shape {
        return data.clone();
    }
    let (iz, iy, ix) = data.dim();
    let (oz, oy, ox) = shape;
    let zs = nearest_indices(iz, oz);
    let ys = nearest_indices(iy, oy);
    let xs = nearest_indices(ix, ox);
    Array3::from_shape_fn(shape, |(z, y, x)| data[[zs[z], ys[y], xs[x]]])
}

fn nearest_indices(input: usize, output: usize) -> Vec<usize> {
    if output <= 1 || input <= 1 {
        return vec![0; output];
    }
    let ratio = (input - 1) as f64 / (output - 1) as f64;
    (0..output)
        .map(|o| ((o as f64 * ratio + 0.5).floor() as usize).min(input - 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_accepts_server_dims_key() {
        let meta: VolumeMeta =
            serde_json::from_str(r#"{"spacing": [1.0, 2.0, 3.0], "dims": [2, 3, 4], "origin": [0.5, 0.0, -1.0]}"#)
                .unwrap();
        assert_eq!(meta.dims, [2, 3, 4]);
        assert_eq!(meta.origin, [0.5, 0.0, -1.0]);

        let meta: VolumeMeta =
            serde_json::from_str(r#"{"spacing": [1, 1, 1], "dimensions": [2, 2, 2]}"#).unwrap();
        assert_eq!(meta.dims, [2, 2, 2]);
        assert_eq!(meta.origin, [0.0; 3]);
    }

    #[test]
    fn load_from_parts_refuses_mismatched_buffer() {
        let err = VolumeLoader::load_from_parts(
            r#"{"spacing": [1, 1, 1], "dims": [2, 2, 2], "origin": [0, 0, 0]}"#,
            vec![0; 9],
            SourceType::Nifti,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VolumeLoaderError::Volume(VolumeError::MalformedVolume {
                expected: 8,
                actual: 9
            })
        ));
    }

    #[test]
    fn load_from_parts_reports_bad_json() {
        let err = VolumeLoader::load_from_parts("{\"dims\": [2, 2]}", vec![0; 4], SourceType::Nifti)
            .unwrap_err();
        assert!(matches!(err, VolumeLoaderError::Json(_)));
    }

    #[test]
    fn descriptor_deserializes_source_type() {
        let descriptor: VolumeDescriptor = serde_json::from_str(
            r#"{"data": [1, 2], "dimensions": [2, 1, 1], "spacing": [1, 1, 1], "origin": [0, 0, 0], "sourceType": "dicom"}"#,
        )
        .unwrap();
        let volume = Volume::try_from(descriptor).unwrap();
        assert_eq!(volume.source_type(), SourceType::Dicom);
        assert_eq!(volume.sample([1, 0, 0]), 2);

        let unknown = serde_json::from_str::<VolumeDescriptor>(
            r#"{"data": [], "dimensions": [1, 1, 1], "spacing": [1, 1, 1], "origin": [0, 0, 0], "sourceType": "analyze"}"#,
        );
        assert!(unknown.is_err());
    }

    #[test]
    fn normalize_spans_the_byte_range() {
        assert_eq!(VolumeLoader::normalize_to_u8(0), 0);
        assert_eq!(VolumeLoader::normalize_to_u8(u16::MAX), 255);
    }

    #[test]
    fn stacking_keeps_slice_order_and_rescales() {
        let slices = vec![
            DicomSlice {
                order: Some(0.0),
                position: None,
                pixels: Array2::from_elem((2, 3), 0),
            },
            DicomSlice {
                order: Some(1.0),
                position: None,
                pixels: Array2::from_elem((2, 3), u16::MAX),
            },
        ];
        let volume = VolumeLoader::build_volume_array(&slices);
        assert_eq!(volume.dim(), (2, 2, 3));
        assert_eq!(volume[[0, 1, 2]], 0);
        assert_eq!(volume[[1, 0, 0]], 255);
    }

    #[test]
    fn image_position_sort_is_ascending() {
        let mut slices: Vec<_> = [2.0, -1.0, 5.0]
            .into_iter()
            .map(|order| DicomSlice {
                order: Some(order),
                position: None,
                pixels: Array2::zeros((1, 1)),
            })
            .collect();
        VolumeLoader::sort_slices(&mut slices, SortBy::ImagePositionPatient);
        let orders: Vec<_> = slices.iter().map(|slice| slice.order).collect();
        assert_eq!(orders, vec![Some(-1.0), Some(2.0), Some(5.0)]);

        slices.reverse();
        VolumeLoader::sort_slices(&mut slices, SortBy::None);
        let orders: Vec<_> = slices.iter().map(|slice| slice.order).collect();
        assert_eq!(orders, vec![Some(5.0), Some(2.0), Some(-1.0)]);
    }

    #[test]
    fn slice_step_comes_from_neighbouring_positions() {
        let slice = |position| DicomSlice {
            order: None,
            position,
            pixels: Array2::zeros((1, 1)),
        };
        let slices = [slice(Some([0.0, 0.0, -2.0])), slice(Some([0.0, 1.5, 0.0]))];
        assert_eq!(VolumeLoader::slice_step(&slices), Some(2.5));
        assert_eq!(VolumeLoader::slice_step(&slices[..1]), None);
        assert_eq!(VolumeLoader::slice_step(&[slice(None), slice(Some([0.0; 3]))]), None);
        assert_eq!(
            VolumeLoader::slice_step(&[slice(Some([1.0; 3])), slice(Some([1.0; 3]))]),
            None
        );
    }

    #[test]
    fn mismatched_slice_sizes_are_rejected() {
        let slices = vec![
            DicomSlice {
                order: None,
                position: None,
                pixels: Array2::zeros((2, 2)),
            },
            DicomSlice {
                order: None,
                position: None,
                pixels: Array2::zeros((2, 3)),
            },
        ];
        assert!(matches!(
            VolumeLoader::validate_dimensions(&slices),
            Err(VolumeLoaderError::InconsistentDimensions)
        ));
    }

    #[test]
    fn nearest_resampling_keeps_corners_and_labels() {
        let mut mask = Array3::<u8>::zeros((2, 2, 2));
        mask[[1, 1, 1]] = 255;
        let up = resample_nearest(&mask, (3, 4, 5));
        assert_eq!(up.dim(), (3, 4, 5));
        assert_eq!(up[[0, 0, 0]], 0);
        assert_eq!(up[[2, 3, 4]], 255);
        assert!(up.iter().all(|&v| v == 0 || v == 255));

        let down = resample_nearest(&up, (2, 2, 2));
        assert_eq!(down, mask);
    }

    #[test]
    fn nearest_indices_round_to_the_closest_input() {
        assert_eq!(nearest_indices(5, 3), vec![0, 2, 4]);
        assert_eq!(nearest_indices(4, 3), vec![0, 2, 3]);
        assert_eq!(nearest_indices(3, 1), vec![0]);
        assert_eq!(nearest_indices(1, 3), vec![0, 0, 0]);
    }

    #[test]
    fn preview_paths_get_a_suffix() {
        assert_eq!(
            preview_path(Path::new("media/volume_base.meta.json")),
            PathBuf::from("media/volume_base.meta_preview.json")
        );
        assert_eq!(
            preview_path(Path::new("volume_nifti.bin")),
            PathBuf::from("volume_nifti_preview.bin")
        );
    }

    #[test]
    fn empty_directory_has_no_images() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            VolumeLoader::load_from_directory(dir.path(), SortBy::default()),
            Err(VolumeLoaderError::NoValidImages)
        ));
    }
}
