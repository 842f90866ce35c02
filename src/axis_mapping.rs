//! Per-format translation of logical slice axes to stored grid dimensions.
//!
//! DICOM series are stacked with I/J/K along x/y/z. NIfTI previews arrive
//! with their axes reversed (z fastest), so the same anatomical planes sit on
//! different stored dimensions and need their own view-up vectors.

use crate::enums::{LogicalAxis, SourceType, ViewId, ViewKind};

#[derive(Debug, PartialEq)]
pub struct AxisMapping {
    source_type: SourceType,
    /// Physical dimension per logical axis, indexed by `LogicalAxis::ordinal`.
    physical: [usize; 3],
    /// Camera view-up per logical axis, indexed by `LogicalAxis::ordinal`.
    view_up: [[f64; 3]; 3],
    views: [(ViewId, ViewKind); 4],
}

static DICOM: AxisMapping = AxisMapping {
    source_type: SourceType::Dicom,
    physical: [0, 1, 2],
    view_up: [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]],
    views: [
        (ViewId::Volume3d, ViewKind::Volumetric),
        (ViewId::Axial, ViewKind::Slice(LogicalAxis::K)),
        (ViewId::Coronal, ViewKind::Slice(LogicalAxis::J)),
        (ViewId::Sagittal, ViewKind::Slice(LogicalAxis::I)),
    ],
};

static NIFTI: AxisMapping = AxisMapping {
    source_type: SourceType::Nifti,
    physical: [2, 0, 1],
    // I is shown in the sagittal pane, J in the axial pane, K in the coronal pane
    view_up: [[0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
    views: [
        (ViewId::Volume3d, ViewKind::Volumetric),
        (ViewId::Axial, ViewKind::Slice(LogicalAxis::J)),
        (ViewId::Coronal, ViewKind::Slice(LogicalAxis::K)),
        (ViewId::Sagittal, ViewKind::Slice(LogicalAxis::I)),
    ],
};

impl AxisMapping {
    pub fn for_source(source_type: SourceType) -> &'static AxisMapping {
        match source_type {
            SourceType::Dicom => &DICOM,
            SourceType::Nifti => &NIFTI,
        }
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn physical_axis(&self, axis: LogicalAxis) -> usize {
        self.physical[axis.ordinal()]
    }

    /// Inverse of [`AxisMapping::physical_axis`].
    pub fn logical_axis(&self, physical_axis: usize) -> Option<LogicalAxis> {
        LogicalAxis::ALL
            .into_iter()
            .find(|axis| self.physical_axis(*axis) == physical_axis)
    }

    pub fn view_up(&self, axis: LogicalAxis) -> [f64; 3] {
        self.view_up[axis.ordinal()]
    }

    pub fn view_kind(&self, view: ViewId) -> ViewKind {
        self.views
            .iter()
            .find(|(id, _)| *id == view)
            .map(|(_, kind)| *kind)
            .unwrap_or(ViewKind::Volumetric)
    }

    /// Physical dimension a 2D view slices along; `None` for the 3D view.
    pub fn physical_axis_of(&self, view: ViewId) -> Option<usize> {
        match self.view_kind(view) {
            ViewKind::Slice(axis) => Some(self.physical_axis(axis)),
            ViewKind::Volumetric => None,
        }
    }

    pub fn views(&self) -> impl Iterator<Item = (ViewId, ViewKind)> + '_ {
        self.views.iter().copied()
    }

    /// The three 2D views with their logical axes, in table order.
    pub fn slice_views(&self) -> impl Iterator<Item = (ViewId, LogicalAxis)> + '_ {
        self.views.iter().filter_map(|(id, kind)| match kind {
            ViewKind::Slice(axis) => Some((*id, *axis)),
            ViewKind::Volumetric => None,
        })
    }
}
