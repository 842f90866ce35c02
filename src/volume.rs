use crate::enums::SourceType;

use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray::s;
use thiserror::Error;

/// Integer voxel address `(i, j, k)`, indexed by physical dimension of the
/// stored grid (x, y, z).
pub type VoxelCoordinate = [usize; 3];

#[derive(Debug, Error, PartialEq)]
pub enum VolumeError {
    #[error("Data mismatch: expected {expected} voxels, but received {actual}")]
    MalformedVolume { expected: usize, actual: usize },

    #[error("Volume dimensions must be positive, got {0:?}")]
    EmptyDimension([usize; 3]),

    #[error("Voxel spacing must be positive and finite, got {0:?}")]
    InvalidSpacing([f64; 3]),

    #[error("Preview step must be at least 1")]
    InvalidPreviewStep,
}

/// One fully loaded, immutable 8-bit volume.
///
/// Samples live in an `(nz, ny, nx)` array in standard layout, so the flat
/// buffer is addressed as `z * nx * ny + y * nx + x`.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<u8>,
    spacing: [f64; 3],
    origin: [f64; 3],
    source_type: SourceType,
}

impl Volume {
    /// Build a volume from a flat x-fastest buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer length is not `nx * ny * nz`, if any
    /// dimension is zero or if the spacing is not strictly positive.
    pub fn new(
        data: Vec<u8>,
        dimensions: [usize; 3],
        spacing: [f64; 3],
        origin: [f64; 3],
        source_type: SourceType,
    ) -> Result<Self, VolumeError> {
        let [nx, ny, nz] = dimensions;
        let expected = nx
            .checked_mul(ny)
            .and_then(|plane| plane.checked_mul(nz))
            .unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(VolumeError::MalformedVolume {
                expected,
                actual: data.len(),
            });
        }
        let data = Array3::from_shape_vec((nz, ny, nx), data).map_err(|_| {
            VolumeError::MalformedVolume {
                expected,
                actual: expected,
            }
        })?;
        Self::from_array(data, spacing, origin, source_type)
    }

    /// Build a volume from an `(nz, ny, nx)` array.
    pub fn from_array(
        data: Array3<u8>,
        spacing: [f64; 3],
        origin: [f64; 3],
        source_type: SourceType,
    ) -> Result<Self, VolumeError> {
        let (nz, ny, nx) = data.dim();
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(VolumeError::EmptyDimension([nx, ny, nz]));
        }
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(VolumeError::InvalidSpacing(spacing));
        }
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Ok(Self {
            data,
            spacing,
            origin,
            source_type,
        })
    }

    /// Voxel counts per axis `[nx, ny, nz]`
    pub fn dimensions(&self) -> [usize; 3] {
        let (nz, ny, nx) = self.data.dim();
        [nx, ny, nz]
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    /// The flat x-fastest sample buffer
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice().unwrap_or(&[])
    }

    /// Value at `voxel`, or 0 when the flat index falls outside the buffer.
    pub fn sample(&self, voxel: VoxelCoordinate) -> u8 {
        let [nx, ny, _] = self.dimensions();
        let [i, j, k] = voxel;
        k.checked_mul(nx * ny)
            .and_then(|z| j.checked_mul(nx).and_then(|y| z.checked_add(y)))
            .and_then(|zy| zy.checked_add(i))
            .and_then(|index| self.as_slice().get(index).copied())
            .unwrap_or(0)
    }

    /// Physical position of a voxel: `origin + spacing * index` per axis.
    pub fn world_position(&self, voxel: VoxelCoordinate) -> [f64; 3] {
        std::array::from_fn(|axis| self.origin[axis] + self.spacing[axis] * voxel[axis] as f64)
    }

    pub fn is_valid_index(&self, physical_axis: usize, index: usize) -> bool {
        physical_axis < 3 && index < self.dimensions()[physical_axis]
    }

    /// The plane at `index` along `physical_axis`.
    ///
    /// The returned view keeps the remaining stored axes in descending
    /// physical order (e.g. `(z, y)` when slicing along x).
    pub fn slice_plane(&self, physical_axis: usize, index: usize) -> Option<ArrayView2<'_, u8>> {
        if !self.is_valid_index(physical_axis, index) {
            return None;
        }
        Some(self.data.index_axis(Axis(2 - physical_axis), index))
    }

    /// Downsample by keeping every `step`-th voxel on each axis.
    pub fn preview(&self, step: usize) -> Result<Volume, VolumeError> {
        if step == 0 {
            return Err(VolumeError::InvalidPreviewStep);
        }
        let stride = step as isize;
        let data = self
            .data
            .slice(s![..;stride, ..;stride, ..;stride])
            .to_owned();
        let spacing = self.spacing.map(|s| s * step as f64);
        Volume::from_array(data, spacing, self.origin, self.source_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(dimensions: [usize; 3]) -> Volume {
        let len = dimensions.iter().product();
        let data = (0..len).map(|v| (v % 256) as u8).collect();
        Volume::new(data, dimensions, [1.0; 3], [0.0; 3], SourceType::Nifti).unwrap()
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = Volume::new(vec![0; 7], [2, 2, 2], [1.0; 3], [0.0; 3], SourceType::Dicom)
            .unwrap_err();
        assert_eq!(
            err,
            VolumeError::MalformedVolume {
                expected: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn rejects_zero_dimension_and_bad_spacing() {
        assert!(matches!(
            Volume::new(vec![], [0, 2, 2], [1.0; 3], [0.0; 3], SourceType::Dicom),
            Err(VolumeError::EmptyDimension(_))
        ));
        assert!(matches!(
            Volume::new(vec![0; 8], [2, 2, 2], [1.0, 0.0, 1.0], [0.0; 3], SourceType::Dicom),
            Err(VolumeError::InvalidSpacing(_))
        ));
    }

    #[test]
    fn sample_uses_x_fastest_layout() {
        let volume = ramp([3, 4, 5]);
        assert_eq!(volume.dimensions(), [3, 4, 5]);
        assert_eq!(volume.sample([0, 0, 0]), 0);
        assert_eq!(volume.sample([1, 0, 0]), 1);
        assert_eq!(volume.sample([0, 1, 0]), 3);
        assert_eq!(volume.sample([0, 0, 1]), 12);
        assert_eq!(volume.sample([2, 3, 4]), 59);
    }

    #[test]
    fn sample_falls_back_to_zero_outside_buffer() {
        let volume = ramp([3, 4, 5]);
        assert_eq!(volume.sample([0, 0, 5]), 0);
        assert_eq!(volume.sample([usize::MAX, 0, 0]), 0);
        assert_eq!(volume.sample([0, usize::MAX, usize::MAX]), 0);
    }

    #[test]
    fn slice_plane_follows_physical_axis() {
        let volume = ramp([3, 4, 5]);
        let along_z = volume.slice_plane(2, 1).unwrap();
        assert_eq!(along_z.dim(), (4, 3));
        assert_eq!(along_z[[1, 2]], volume.sample([2, 1, 1]));

        let along_x = volume.slice_plane(0, 2).unwrap();
        assert_eq!(along_x.dim(), (5, 4));
        assert_eq!(along_x[[3, 1]], volume.sample([2, 1, 3]));

        assert!(volume.slice_plane(1, 4).is_none());
        assert!(volume.slice_plane(3, 0).is_none());
    }

    #[test]
    fn preview_keeps_every_nth_voxel() {
        let volume = ramp([4, 4, 4]);
        let preview = volume.preview(2).unwrap();
        assert_eq!(preview.dimensions(), [2, 2, 2]);
        assert_eq!(preview.spacing(), [2.0; 3]);
        assert_eq!(preview.sample([1, 1, 1]), volume.sample([2, 2, 2]));
        assert_eq!(volume.preview(0).unwrap_err(), VolumeError::InvalidPreviewStep);
    }

    #[test]
    fn world_position_applies_spacing_and_origin() {
        let volume = Volume::new(
            vec![0; 8],
            [2, 2, 2],
            [0.5, 1.0, 2.0],
            [10.0, -5.0, 0.0],
            SourceType::Dicom,
        )
        .unwrap();
        assert_eq!(volume.world_position([1, 1, 1]), [10.5, -4.0, 2.0]);
    }
}
