//! # MPR-sync library
//!
//! This crate implements the coordinate core of a four-pane multi-planar
//! viewer: one volumetric view and three orthogonal slice views over the same
//! DICOM or NIfTI volume.

//!
//! A [`Volume`] is a validated flat 8-bit voxel buffer (x fastest, then y,
//! then z) together with its dimensions, spacing and origin. Which stored
//! dimension each slice view cuts along depends on the source format and is
//! looked up in a static [`AxisMapping`]:
//!  - Axial
//!  - Coronal
//!  - Sagittal
//!
//! A click in one slice view is resolved to a voxel by the view's
//! [`SliceProjector`]. The [`ViewerSession`] then moves every other view onto
//! the slice containing that voxel, places a crosshair in every view and
//! reports the voxel value. Rendering itself is left to the caller; the
//! session only hands out slice indices, crosshair positions, camera
//! parameters and grayscale slice images.
//!
//! # Examples
//!
//! ## Synchronising the views on a click
//!
//! Load a preview volume written by the conversion step, set up all views and
//! click into the axial view.
//!
//! ```no_run
//! # use mpr_sync::{ClickEvent, ContentBox, SourceType, ViewerSession, VolumeLoader};
//! let volume = VolumeLoader::load_from_files(
//!     "media/volume_base.meta_preview.json",
//!     "media/volume_nifti_preview.bin",
//!     SourceType::Nifti,
//! )
//! .expect("should have loaded the preview volume");
//! let mut session = ViewerSession::new(volume);
//! session.initialize_all(ContentBox::new(256.0, 256.0));
//!
//! let outcome = session
//!     .handle_click(&ClickEvent {
//!         view_id: "viewer-axial".to_string(),
//!         pixel_x: 100.0,
//!         pixel_y: 40.0,
//!         content_width: 256.0,
//!         content_height: 256.0,
//!     })
//!     .expect("should have accepted the click");
//! if let Some(outcome) = outcome {
//!     println!("value {} at {:?}", outcome.readout.value, outcome.readout.voxel);
//! }
//! ```
//!
//! ## Overlaying a segmentation
//!
//! Masks and landmark sets are resampled onto the base grid so every readout
//! also reports their values.
//!
//! ```no_run
//! # use mpr_sync::{LandmarkSet, VolumeLoader, ViewerSession, landmarks::DEFAULT_RADIUS_MM};
//! # use mpr_sync::volume_loader::DEFAULT_CONTRAST_FACTOR;
//! let base = VolumeLoader::load_from_nifti("scan.nii.gz", DEFAULT_CONTRAST_FACTOR)
//!     .expect("should have loaded the scan");
//! let reference = (&base).into();
//! let mask = VolumeLoader::load_segmentation_from_nifti("scan_seg.nii.gz", Some(&reference))
//!     .expect("should have loaded the segmentation");
//! let landmarks = LandmarkSet::from_directory("landmarks/")
//!     .and_then(|set| set.to_mask(&reference, DEFAULT_RADIUS_MM))
//!     .expect("should have rendered the landmarks");
//!
//! let mut session = ViewerSession::new(base);
//! session.add_overlay("segmentation", mask).expect("same grid");
//! session.add_overlay("landmarks", landmarks).expect("same grid");
//! ```

pub mod axis_mapping;
pub mod enums;
pub mod landmarks;
pub mod logging;
pub mod projector;
pub mod session;
pub mod volume;
pub mod volume_loader;

pub use axis_mapping::AxisMapping;
pub use landmarks::{Landmark, LandmarkError, LandmarkSet, VoxelLandmark};
pub use enums::{LogicalAxis, SortBy, SourceType, ViewId, ViewKind};
pub use projector::{CameraSetup, ContentBox, PixelPosition, SliceProjector, SliceSetup};
pub use session::{
    BroadcastOutcome, ClickEvent, SessionError, SliceUpdate, ViewState, ViewerSession,
    VoxelReadout,
};
pub use volume::{Volume, VolumeError, VoxelCoordinate};
pub use volume_loader::{VolumeDescriptor, VolumeLoader, VolumeLoaderError, VolumeMeta};
