//! Landmark sets exported as 3D Slicer markups, and their rendering into
//! mask volumes that can be overlaid on the base volume.
//!
//! Markup positions are stored in LPS; they are turned into RAS on read by
//! negating x and y. Before mapping them into voxel space, the axes are
//! reversed to follow the stored volume, whose x is the NIfTI file's last
//! axis.

use log::{debug, info, warn};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

use crate::enums::SourceType;
use crate::volume::{Volume, VolumeError};
use crate::volume_loader::VolumeMeta;

/// Sphere radius used when rendering landmarks.
pub const DEFAULT_RADIUS_MM: f64 = 3.0;

/// Reverses `(x, y, z)` into the stored volume's axis order.
pub const VOLUME_AXIS_ORDER: [usize; 3] = [2, 1, 0];

#[derive(Debug, Error)]
pub enum LandmarkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid markups file {path}: {source}")]
    Markups {
        path: String,
        source: serde_json::Error,
    },

    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Landmark {
    pub id: Option<String>,
    pub label: Option<String>,
    pub position: [f64; 3],
}

/// A landmark with its continuous voxel coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoxelLandmark {
    pub landmark: Landmark,
    pub voxel: [f64; 3],
}

impl VoxelLandmark {
    /// Nearest voxel; may lie outside the volume.
    pub fn nearest_voxel(&self) -> [i64; 3] {
        self.voxel.map(|v| v.round() as i64)
    }
}

#[derive(Deserialize)]
struct MarkupsFile {
    #[serde(default)]
    markups: Vec<Markup>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Markup {
    #[serde(default)]
    control_points: Vec<ControlPoint>,
}

#[derive(Deserialize)]
struct ControlPoint {
    id: Option<String>,
    label: Option<String>,
    #[serde(default)]
    position: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    landmarks: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// Parse one markups JSON document, converting LPS positions to RAS.
    pub fn from_markups_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: MarkupsFile = serde_json::from_str(json)?;
        let landmarks = file
            .markups
            .into_iter()
            .flat_map(|markup| markup.control_points)
            .map(|point| {
                let [x, y, z] = point.position;
                Landmark {
                    id: point.id,
                    label: point.label,
                    position: [-x, -y, z],
                }
            })
            .collect();
        Ok(Self { landmarks })
    }

    /// Read every `.json` file in `dir`, in file name order.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, LandmarkError> {
        let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            })
            .collect();
        paths.sort();

        let mut landmarks = Vec::new();
        for path in &paths {
            let json = fs::read_to_string(path)?;
            let set = Self::from_markups_json(&json).map_err(|source| LandmarkError::Markups {
                path: path.display().to_string(),
                source,
            })?;
            landmarks.extend(set.landmarks);
        }
        if landmarks.is_empty() {
            warn!("event=landmarks_empty dir={}", dir.as_ref().display());
        }
        info!(
            "event=landmarks_read dir={} files={} landmarks={}",
            dir.as_ref().display(),
            paths.len(),
            landmarks.len()
        );
        Ok(Self { landmarks })
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.iter()
    }

    /// Reorder position components: component `d` becomes `position[order[d]]`.
    pub fn permuted(&self, order: [usize; 3]) -> Self {
        let landmarks = self
            .landmarks
            .iter()
            .map(|landmark| Landmark {
                position: order.map(|axis| landmark.position[axis]),
                ..landmark.clone()
            })
            .collect();
        Self { landmarks }
    }

    /// `(position - origin) / spacing` per axis.
    pub fn to_voxel_space(&self, origin: [f64; 3], spacing: [f64; 3]) -> Vec<VoxelLandmark> {
        self.landmarks
            .iter()
            .map(|landmark| VoxelLandmark {
                landmark: landmark.clone(),
                voxel: std::array::from_fn(|d| (landmark.position[d] - origin[d]) / spacing[d]),
            })
            .collect()
    }

    /// Render this set as a `0`/`255` mask on the grid of `reference`.
    ///
    /// Positions are put into stored axis order and measured from
    /// [`anchored_origin`] of the reference origin.
    pub fn to_mask(&self, reference: &VolumeMeta, radius_mm: f64) -> Result<Volume, LandmarkError> {
        let origin = anchored_origin(reference.origin);
        let voxels = self
            .permuted(VOLUME_AXIS_ORDER)
            .to_voxel_space(origin, reference.spacing);
        for landmark in &voxels {
            debug!(
                "event=landmark_voxel label={:?} voxel={:?}",
                landmark.landmark.label, landmark.voxel
            );
        }
        Ok(render_spheres(
            &voxels,
            reference.dims,
            reference.spacing,
            reference.origin,
            radius_mm,
        )?)
    }
}

/// Landmark positions are measured from the most negative corner: every
/// component of the volume origin is moved to the negative side.
pub fn anchored_origin(origin: [f64; 3]) -> [f64; 3] {
    origin.map(|o| -o.abs())
}

/// Draw a filled sphere of `radius_mm` (ellipsoidal in voxels on anisotropic
/// grids) around each landmark's nearest voxel. Parts outside the grid are
/// cut off.
pub fn render_spheres(
    landmarks: &[VoxelLandmark],
    dimensions: [usize; 3],
    spacing: [f64; 3],
    origin: [f64; 3],
    radius_mm: f64,
) -> Result<Volume, VolumeError> {
    if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(VolumeError::InvalidSpacing(spacing));
    }
    let [nx, ny, nz] = dimensions;
    let mut mask = Array3::<u8>::zeros((nz, ny, nx));
    let radii = std::array::from_fn::<i64, 3, _>(|d| (radius_mm / spacing[d]).round() as i64);
    let radius_sq = radius_mm * radius_mm;

    for landmark in landmarks {
        let [ci, cj, ck] = landmark.nearest_voxel();
        for dk in -radii[2]..=radii[2] {
            for dj in -radii[1]..=radii[1] {
                for di in -radii[0]..=radii[0] {
                    let offset = [di, dj, dk];
                    let distance_sq: f64 = (0..3)
                        .map(|d| (offset[d] as f64 * spacing[d]).powi(2))
                        .sum();
                    if distance_sq > radius_sq {
                        continue;
                    }
                    let (Ok(k), Ok(j), Ok(i)) = (
                        usize::try_from(ck + dk),
                        usize::try_from(cj + dj),
                        usize::try_from(ci + di),
                    ) else {
                        continue;
                    };
                    if let Some(voxel) = mask.get_mut([k, j, i]) {
                        *voxel = u8::MAX;
                    }
                }
            }
        }
    }

    Volume::from_array(mask, spacing, origin, SourceType::Nifti)
}
