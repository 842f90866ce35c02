//! Viewer session: per-view slice state and crosshair synchronisation.
//!
//! A [`ViewerSession`] owns the loaded base volume, any overlays drawn on the
//! same grid (segmentation masks, landmark volumes) and one [`ViewState`] per
//! initialised 2D view. A click in one view is resolved to a voxel and fanned
//! out to every other view through [`ViewerSession::broadcast`].

use std::collections::BTreeMap;

use image::{GrayImage, ImageBuffer};
use log::{debug, info, warn};
use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::axis_mapping::AxisMapping;
use crate::enums::{UnknownViewId, ViewId};
use crate::projector::{ContentBox, PixelPosition, SliceProjector, SliceSetup};
use crate::volume::{Volume, VoxelCoordinate};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    UnknownView(#[from] UnknownViewId),

    #[error("View {0} renders the whole volume and has no slice plane")]
    NotASliceView(ViewId),

    #[error("Dataset {name} has dimensions {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        name: String,
        expected: [usize; 3],
        actual: [usize; 3],
    },
}

/// A click inside one view's content rectangle, in pixels relative to its
/// top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub view_id: String,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub content_width: f64,
    pub content_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    physical_axis: usize,
    current_slice_index: usize,
    content: ContentBox,
    crosshair: Option<PixelPosition>,
}

impl ViewState {
    pub fn physical_axis(&self) -> usize {
        self.physical_axis
    }

    pub fn current_slice_index(&self) -> usize {
        self.current_slice_index
    }

    pub fn content(&self) -> ContentBox {
        self.content
    }

    pub fn crosshair(&self) -> Option<PixelPosition> {
        self.crosshair
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceUpdate {
    pub view_id: ViewId,
    pub new_slice_index: usize,
    pub crosshair_pixel_x: f64,
    pub crosshair_pixel_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySample {
    pub name: String,
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoxelReadout {
    pub voxel: VoxelCoordinate,
    pub value: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<OverlaySample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastOutcome {
    pub updates: Vec<SliceUpdate>,
    pub readout: VoxelReadout,
}

impl BroadcastOutcome {
    pub fn update_for(&self, view: ViewId) -> Option<&SliceUpdate> {
        self.updates.iter().find(|update| update.view_id == view)
    }
}

pub struct ViewerSession {
    volume: Volume,
    mapping: &'static AxisMapping,
    views: BTreeMap<ViewId, ViewState>,
    overlays: Vec<(String, Volume)>,
    last_readout: Option<VoxelReadout>,
}

impl ViewerSession {
    pub fn new(volume: Volume) -> Self {
        let mapping = AxisMapping::for_source(volume.source_type());
        info!(
            "event=session_open source={} dims={:?} spacing={:?} origin={:?}",
            volume.source_type(),
            volume.dimensions(),
            volume.spacing(),
            volume.origin()
        );
        Self {
            volume,
            mapping,
            views: BTreeMap::new(),
            overlays: Vec::new(),
            last_readout: None,
        }
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn mapping(&self) -> &'static AxisMapping {
        self.mapping
    }

    pub fn view_state(&self, view: ViewId) -> Option<&ViewState> {
        self.views.get(&view)
    }

    pub fn views(&self) -> impl Iterator<Item = (ViewId, &ViewState)> {
        self.views.iter().map(|(id, state)| (*id, state))
    }

    pub fn last_readout(&self) -> Option<&VoxelReadout> {
        self.last_readout.as_ref()
    }

    fn projector(&self, view: ViewId) -> Option<SliceProjector> {
        self.mapping
            .physical_axis_of(view)
            .map(|axis| SliceProjector::new(view, axis, self.volume.dimensions()))
    }

    /// Create the slice state of a 2D view, starting on its middle slice.
    ///
    /// An already initialised view keeps its slice and crosshair and only
    /// takes the new content box. Returns `None` for the volumetric view.
    pub fn initialize_view(&mut self, view: ViewId, content: ContentBox) -> Option<SliceSetup> {
        let projector = self.projector(view)?;
        let state = self.views.entry(view).or_insert_with(|| {
            debug!(
                "event=view_init view={view} axis={} slice={}",
                projector.physical_axis(),
                projector.initial_slice_index()
            );
            ViewState {
                physical_axis: projector.physical_axis(),
                current_slice_index: projector.initial_slice_index(),
                content,
                crosshair: None,
            }
        });
        state.content = content;
        let slice_index = state.current_slice_index;
        self.slice_setup_at(projector, slice_index)
    }

    /// Initialise every view of the mapping with the same content box.
    pub fn initialize_all(&mut self, content: ContentBox) -> Vec<SliceSetup> {
        let views: Vec<ViewId> = self.mapping.views().map(|(id, _)| id).collect();
        views
            .into_iter()
            .filter_map(|view| self.initialize_view(view, content))
            .collect()
    }

    /// Slice and camera parameters for the current state of a view.
    pub fn slice_setup(&self, view: ViewId) -> Option<SliceSetup> {
        let state = self.views.get(&view)?;
        self.slice_setup_at(self.projector(view)?, state.current_slice_index)
    }

    fn slice_setup_at(&self, projector: SliceProjector, slice_index: usize) -> Option<SliceSetup> {
        let axis = self.mapping.logical_axis(projector.physical_axis())?;
        Some(projector.setup(
            slice_index,
            self.volume.spacing(),
            self.volume.origin(),
            self.mapping.view_up(axis),
        ))
    }

    /// Record a newly measured content box. Returns `false` for views
    /// without state.
    pub fn resize_view(&mut self, view: ViewId, content: ContentBox) -> bool {
        match self.views.get_mut(&view) {
            Some(state) => {
                state.content = content;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.views.clear();
        self.last_readout = None;
        info!("event=session_reset status=ok");
    }

    /// Resolve a click to a voxel and synchronise every view on it.
    ///
    /// Clicks on a view that has not been initialised yet are ignored.
    ///
    /// # Errors
    ///
    /// Unknown view identifiers and clicks on the volumetric view.
    pub fn handle_click(
        &mut self,
        event: &ClickEvent,
    ) -> Result<Option<BroadcastOutcome>, SessionError> {
        let view: ViewId = event.view_id.parse()?;
        let projector = self
            .projector(view)
            .ok_or(SessionError::NotASliceView(view))?;
        let Some(state) = self.views.get_mut(&view) else {
            warn!("event=click_ignored view={view} reason=not_initialized");
            return Ok(None);
        };

        let content = ContentBox::new(event.content_width, event.content_height);
        state.content = content;
        let pixel = PixelPosition {
            x: event.pixel_x,
            y: event.pixel_y,
        };
        let voxel = projector.pixel_to_voxel(pixel, content, state.current_slice_index);
        debug!(
            "event=click view={view} pixel=({}, {}) voxel={voxel:?}",
            event.pixel_x, event.pixel_y
        );

        Ok(Some(self.broadcast(voxel, view)))
    }

    /// Fan `origin_voxel` out to all registered 2D views.
    ///
    /// Every view other than `origin_view` moves to the slice containing the
    /// voxel; every view, the origin included, gets a new crosshair.
    pub fn broadcast(&mut self, origin_voxel: VoxelCoordinate, origin_view: ViewId) -> BroadcastOutcome {
        let dimensions = self.volume.dimensions();
        let mut updates = Vec::with_capacity(self.views.len());

        for (view, state) in self.views.iter_mut() {
            let projector = SliceProjector::new(*view, state.physical_axis, dimensions);
            if *view != origin_view {
                state.current_slice_index =
                    projector.clamp_slice_index(origin_voxel[state.physical_axis]);
            }
            let crosshair = projector.voxel_to_pixel(origin_voxel, state.content);
            state.crosshair = Some(crosshair);
            updates.push(SliceUpdate {
                view_id: *view,
                new_slice_index: state.current_slice_index,
                crosshair_pixel_x: crosshair.x,
                crosshair_pixel_y: crosshair.y,
            });
        }

        let readout = self.readout(origin_voxel);
        debug!(
            "event=broadcast origin={origin_view} voxel={origin_voxel:?} value={} views={}",
            readout.value,
            updates.len()
        );
        self.last_readout = Some(readout.clone());
        BroadcastOutcome { updates, readout }
    }

    pub fn sample(&self, voxel: VoxelCoordinate) -> u8 {
        self.volume.sample(voxel)
    }

    fn readout(&self, voxel: VoxelCoordinate) -> VoxelReadout {
        VoxelReadout {
            voxel,
            value: self.volume.sample(voxel),
            overlays: self
                .overlays
                .iter()
                .map(|(name, overlay)| OverlaySample {
                    name: name.clone(),
                    value: overlay.sample(voxel),
                })
                .collect(),
        }
    }

    /// Add a dataset drawn over the base volume, replacing one with the
    /// same name.
    pub fn add_overlay(&mut self, name: impl Into<String>, overlay: Volume) -> Result<(), SessionError> {
        let name = name.into();
        let expected = self.volume.dimensions();
        let actual = overlay.dimensions();
        if expected != actual {
            return Err(SessionError::DimensionMismatch {
                name,
                expected,
                actual,
            });
        }
        info!("event=overlay_add name={name} dims={actual:?}");
        match self.overlays.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = overlay,
            None => self.overlays.push((name, overlay)),
        }
        Ok(())
    }

    /// Remove every overlay whose name contains `name`, ignoring case.
    pub fn remove_datasets(&mut self, name: &str) -> usize {
        let needle = name.to_lowercase();
        let before = self.overlays.len();
        self.overlays
            .retain(|(existing, _)| !existing.to_lowercase().contains(&needle));
        let removed = before - self.overlays.len();
        info!("event=overlay_remove pattern={name} removed={removed}");
        removed
    }

    pub fn clear_overlays(&mut self) {
        self.overlays.clear();
    }

    pub fn overlay_names(&self) -> impl Iterator<Item = &str> {
        self.overlays.iter().map(|(name, _)| name.as_str())
    }

    /// The current slice of a 2D view as an 8-bit image, with the view's
    /// horizontal axis as image width and vertical axis as image height.
    pub fn render_slice(&self, view: ViewId) -> Option<GrayImage> {
        let state = self.views.get(&view)?;
        let projector = self.projector(view)?;
        let plane = self
            .volume
            .slice_plane(state.physical_axis, state.current_slice_index)?;
        let (_, vertical) = projector.in_plane_axes();
        plane_to_image(plane, state.physical_axis, vertical)
    }
}

fn plane_to_image(plane: ArrayView2<'_, u8>, physical_axis: usize, vertical: usize) -> Option<GrayImage> {
    // planes keep the higher remaining physical axis as rows
    let row_axis = (0..3).filter(|axis| *axis != physical_axis).max()?;
    let plane = if row_axis == vertical {
        plane
    } else {
        plane.reversed_axes()
    };
    let (height, width) = plane.dim();
    let pixel_data: Vec<u8> = (0..height)
        .into_par_iter()
        .flat_map_iter(|row| plane.row(row).to_vec())
        .collect();
    ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
}
