use crate::geo::BoundingBox;
use crate::prelude::Coordinate;
use crate::view::marker::{Marker, MarkerStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Handle to a marker placed on a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub center: Coordinate,
    pub zoom: f32,
}

/// View shown before any data arrives.
pub const INITIAL_VIEW: CameraView = CameraView {
    center: Coordinate::new(40.0, -120.0),
    zoom: 5.0,
};
pub const FLY_TO_ZOOM: f32 = 9.0;
pub const FLY_TO_DURATION: Duration = Duration::from_millis(1500);
pub const FIT_PADDING_PX: u32 = 50;

/// The drawing backend a [`crate::view::MapController`] drives.
///
/// Implementations own the actual rendering; the controller only issues
/// marker and camera commands.
pub trait MapSurface {
    fn set_view(&mut self, view: CameraView);
    fn add_marker(&mut self, marker: Marker) -> MarkerId;
    fn restyle_marker(&mut self, id: MarkerId, style: MarkerStyle);
    fn remove_marker(&mut self, id: MarkerId);
    fn fly_to(&mut self, view: CameraView, duration: Duration);
    fn fit_bounds(&mut self, bounds: BoundingBox, padding_px: u32);
    /// Drops every layer and listener. The surface is not used afterwards.
    fn release(&mut self);
}
