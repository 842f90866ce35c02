//! Pixel/voxel transforms for a single 2D view.
//!
//! A view slicing along physical axis `a` shows the two remaining axes in the
//! rotation order `(a + 1) % 3` horizontally and `(a + 2) % 3` vertically. The
//! coronal view swaps that pair; together with its view-up vector this gives
//! the radiological display orientation, so the swap applies to both
//! directions of the transform.

use serde::{Deserialize, Serialize};

use crate::enums::ViewId;
use crate::volume::VoxelCoordinate;

/// Added before flooring so that `voxel -> pixel -> voxel` is exact.
///
/// `voxel_to_pixel` targets the left/top edge of a cell, and `k / n * w / w * n`
/// can land a hair below `k` in floating point. A click within `1e-9` voxel
/// units short of a cell's far edge therefore resolves to the next cell
/// instead of a strict `floor`: 33.33333333 of 100 pixels over 3 voxels gives
/// index 1, 33.3 gives 0.
const FLOOR_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPosition {
    pub x: f64,
    pub y: f64,
}

/// Measured size of a view's content rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentBox {
    pub width: f64,
    pub height: f64,
}

impl ContentBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSetup {
    pub parallel_projection: bool,
    pub focal_point: [f64; 3],
    pub position: [f64; 3],
    pub view_up: [f64; 3],
}

/// Everything the rendering side needs to show one slice of a view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceSetup {
    pub view: ViewId,
    pub physical_axis: usize,
    pub slice_index: usize,
    pub horizontal_axis: usize,
    pub vertical_axis: usize,
    pub camera: CameraSetup,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceProjector {
    view: ViewId,
    physical_axis: usize,
    dimensions: [usize; 3],
}

impl SliceProjector {
    pub fn new(view: ViewId, physical_axis: usize, dimensions: [usize; 3]) -> Self {
        Self {
            view,
            physical_axis,
            dimensions,
        }
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn physical_axis(&self) -> usize {
        self.physical_axis
    }

    /// `(horizontal, vertical)` physical dimensions shown by this view.
    pub fn in_plane_axes(&self) -> (usize, usize) {
        let first = (self.physical_axis + 1) % 3;
        let second = (self.physical_axis + 2) % 3;
        match self.view {
            ViewId::Coronal => (second, first),
            _ => (first, second),
        }
    }

    pub fn initial_slice_index(&self) -> usize {
        self.dimensions[self.physical_axis] / 2
    }

    /// Clamp an index along the slicing axis to `[0, dim - 1]`.
    pub fn clamp_slice_index(&self, index: usize) -> usize {
        index.min(self.dimensions[self.physical_axis].saturating_sub(1))
    }

    pub fn setup(
        &self,
        slice_index: usize,
        spacing: [f64; 3],
        origin: [f64; 3],
        view_up: [f64; 3],
    ) -> SliceSetup {
        let axis = self.physical_axis;
        let slice_index = self.clamp_slice_index(slice_index);
        let (horizontal_axis, vertical_axis) = self.in_plane_axes();

        let mut focal_point = origin;
        focal_point[axis] += spacing[axis] * slice_index as f64;
        let mut position = focal_point;
        position[axis] += spacing[axis];

        SliceSetup {
            view: self.view,
            physical_axis: axis,
            slice_index,
            horizontal_axis,
            vertical_axis,
            camera: CameraSetup {
                parallel_projection: true,
                focal_point,
                position,
                view_up,
            },
        }
    }

    /// Resolve a click inside the content box to a voxel on `slice_index`.
    ///
    /// Positions outside the box are clamped onto its edge.
    pub fn pixel_to_voxel(
        &self,
        pixel: PixelPosition,
        content: ContentBox,
        slice_index: usize,
    ) -> VoxelCoordinate {
        let (horizontal, vertical) = self.in_plane_axes();
        let mut voxel = [0; 3];
        voxel[self.physical_axis] = self.clamp_slice_index(slice_index);
        voxel[horizontal] = self.scale(fraction(pixel.x, content.width), horizontal);
        voxel[vertical] = self.scale(fraction(pixel.y, content.height), vertical);
        voxel
    }

    /// Crosshair position of `voxel` within the content box.
    pub fn voxel_to_pixel(&self, voxel: VoxelCoordinate, content: ContentBox) -> PixelPosition {
        let (horizontal, vertical) = self.in_plane_axes();
        PixelPosition {
            x: voxel[horizontal] as f64 / self.dimensions[horizontal] as f64 * content.width,
            y: voxel[vertical] as f64 / self.dimensions[vertical] as f64 * content.height,
        }
    }

    fn scale(&self, fraction: f64, axis: usize) -> usize {
        let count = self.dimensions[axis];
        let index = (fraction * count as f64 + FLOOR_TOLERANCE).floor() as usize;
        index.min(count.saturating_sub(1))
    }
}

fn fraction(offset: f64, extent: f64) -> f64 {
    if !extent.is_finite() || extent <= 0.0 || offset.is_nan() {
        return 0.0;
    }
    (offset / extent).clamp(0.0, 1.0)
}
