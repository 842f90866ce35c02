use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format the volume was produced from. Selects the axis mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Dicom,
    Nifti,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown source type: {0}")]
pub struct UnknownSourceType(pub String);

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Dicom => "dicom",
            SourceType::Nifti => "nifti",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = UnknownSourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dicom" => Ok(SourceType::Dicom),
            "nifti" => Ok(SourceType::Nifti),
            _ => Err(UnknownSourceType(s.to_string())),
        }
    }
}

/// Logical slice axis tag. Its physical dimension depends on the source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalAxis {
    I,
    J,
    K,
}

impl LogicalAxis {
    pub const ALL: [LogicalAxis; 3] = [LogicalAxis::I, LogicalAxis::J, LogicalAxis::K];

    pub(crate) fn ordinal(self) -> usize {
        match self {
            LogicalAxis::I => 0,
            LogicalAxis::J => 1,
            LogicalAxis::K => 2,
        }
    }
}

/// The four viewer panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViewId {
    #[serde(rename = "viewer-3d")]
    Volume3d,
    #[serde(rename = "viewer-axial")]
    Axial,
    #[serde(rename = "viewer-coronal")]
    Coronal,
    #[serde(rename = "viewer-sagittal")]
    Sagittal,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown view id: {0}")]
pub struct UnknownViewId(pub String);

impl ViewId {
    pub const ALL: [ViewId; 4] = [
        ViewId::Volume3d,
        ViewId::Axial,
        ViewId::Coronal,
        ViewId::Sagittal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewId::Volume3d => "viewer-3d",
            ViewId::Axial => "viewer-axial",
            ViewId::Coronal => "viewer-coronal",
            ViewId::Sagittal => "viewer-sagittal",
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewId {
    type Err = UnknownViewId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewId::ALL
            .into_iter()
            .find(|view| view.as_str() == s)
            .ok_or_else(|| UnknownViewId(s.to_string()))
    }
}

/// What a pane shows: the whole volume, or single slices along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Volumetric,
    Slice(LogicalAxis),
}

/// Ordering applied to the files of a DICOM series before stacking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
