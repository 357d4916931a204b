//! Marker lifecycle and camera behaviour for one map surface.
//!
//! Every redraw clears all markers and rebuilds them from the current data.
//! Marker counts are bounded in the hundreds, so there is no diffing; past
//! low thousands of markers this becomes the limiting cost.

use crate::geo::BoundingBox;
use crate::model::{Incident, SatelliteEventPoint, Sensor, ThermalDetectionPoint, UserReport};
use crate::view::marker::{self, Marker, MarkerKind, Popup};
use crate::view::registry::{MarkerRegistry, RegisteredMarker};
use crate::view::surface::{
    CameraView, MapSurface, MarkerId, FIT_PADDING_PX, FLY_TO_DURATION, FLY_TO_ZOOM, INITIAL_VIEW,
};
use log::debug;

/// Borrowed view of everything drawn in one render cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapData<'a> {
    pub incidents: &'a [Incident],
    pub sensors: &'a [Sensor],
    pub reports: &'a [UserReport],
    pub events: &'a [SatelliteEventPoint],
    pub detections: &'a [ThermalDetectionPoint],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Initialized,
}

pub struct MapController<S: MapSurface> {
    surface: Option<S>,
    registry: MarkerRegistry,
    drawn_revision: Option<u64>,
    selected: Option<String>,
    flown_to: Option<String>,
    bounds_fitted: bool,
    hovered: Option<MarkerId>,
}

impl<S: MapSurface> MapController<S> {
    pub fn new() -> Self {
        Self {
            surface: None,
            registry: MarkerRegistry::new(),
            drawn_revision: None,
            selected: None,
            flown_to: None,
            bounds_fitted: false,
            hovered: None,
        }
    }

    /// Attaches the surface and shows the initial view. Any previous surface is released.
    pub fn mount(&mut self, mut surface: S) {
        self.unmount();
        surface.set_view(INITIAL_VIEW);
        self.surface = Some(surface);
    }

    /// Removes all markers and releases the surface. Latches reset for the next mount.
    pub fn unmount(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            self.registry.clear(&mut surface);
            surface.release();
        }
        self.drawn_revision = None;
        self.selected = None;
        self.flown_to = None;
        self.bounds_fitted = false;
        self.hovered = None;
    }

    pub fn state(&self) -> ControllerState {
        if self.surface.is_some() {
            ControllerState::Initialized
        } else {
            ControllerState::Uninitialized
        }
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn markers(&self) -> impl Iterator<Item = &RegisteredMarker> {
        self.registry.iter()
    }

    /// Redraws every marker when `revision` differs from the last drawn one.
    ///
    /// Returns whether a redraw happened.
    pub fn render(&mut self, revision: u64, data: &MapData<'_>, selected: Option<&str>) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        if self.drawn_revision == Some(revision) {
            return false;
        }

        self.registry.clear(surface);
        self.hovered = None;

        let mut drawn = Vec::with_capacity(
            data.incidents.len()
                + data.sensors.len()
                + data.reports.len()
                + data.events.len()
                + data.detections.len(),
        );
        for incident in data.incidents {
            let is_selected = selected == Some(incident.id.as_str());
            drawn.push((
                marker::incident_marker(incident, is_selected),
                marker::severity_radius(incident.severity),
            ));
        }
        for sensor in data.sensors {
            let m = marker::sensor_marker(sensor);
            let radius = m.style.radius;
            drawn.push((m, radius));
        }
        for report in data.reports {
            let m = marker::report_marker(report);
            let radius = m.style.radius;
            drawn.push((m, radius));
        }
        // Thermal detections go last so they sit above event markers.
        for event in data.events {
            drawn.push((marker::event_marker(event), marker::POINT_RADIUS));
        }
        for detection in data.detections {
            drawn.push((marker::thermal_marker(detection), marker::POINT_RADIUS));
        }

        for (m, base_radius) in drawn {
            place(surface, &mut self.registry, m, base_radius);
        }

        debug!(
            "map redraw revision {} with {} markers",
            revision,
            self.registry.len()
        );
        self.drawn_revision = Some(revision);
        self.selected = selected.map(str::to_string);
        true
    }

    /// Frames all event points once per mount, after the event feed has loaded.
    ///
    /// Returns whether the camera moved.
    pub fn fit_to_events(&mut self, events: &[SatelliteEventPoint], loading: bool) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        if self.bounds_fitted || loading {
            return false;
        }
        let Some(bounds) = BoundingBox::enclosing(events.iter().map(SatelliteEventPoint::coordinate))
        else {
            return false;
        };

        surface.fit_bounds(bounds, FIT_PADDING_PX);
        self.bounds_fitted = true;
        true
    }

    /// Flies to the selected incident whenever the selection changes.
    ///
    /// Returns whether a fly-to was issued.
    pub fn sync_selection(&mut self, selected: Option<&Incident>) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let selected_id = selected.map(|incident| incident.id.clone());
        if selected_id == self.flown_to {
            return false;
        }
        self.flown_to = selected_id;

        match selected {
            Some(incident) => {
                surface.fly_to(
                    CameraView {
                        center: incident.coordinate(),
                        zoom: FLY_TO_ZOOM,
                    },
                    FLY_TO_DURATION,
                );
                true
            }
            None => false,
        }
    }

    /// Pointer moved onto `id` (or off every marker when `None`).
    pub fn hover(&mut self, id: Option<MarkerId>) {
        if self.hovered == id {
            return;
        }
        if let Some(previous) = self.hovered.take() {
            self.restyle(previous, |entry| marker::rest_style(&entry.kind, &entry.drawn_style));
        }
        if let Some(current) = id {
            self.restyle(current, |entry| {
                marker::hover_style(&entry.kind, &entry.drawn_style, entry.base_radius)
            });
            self.hovered = Some(current);
        }
    }

    pub fn hovered(&self) -> Option<MarkerId> {
        self.hovered
    }

    /// Incident id to select when `id` is clicked; other marker kinds only show their popup.
    pub fn click(&self, id: MarkerId) -> Option<String> {
        match &self.registry.get(id)?.kind {
            MarkerKind::Incident(incident_id) => Some(incident_id.clone()),
            _ => None,
        }
    }

    pub fn popup(&self, id: MarkerId) -> Option<&Popup> {
        self.registry.get(id).map(|entry| &entry.popup)
    }

    pub fn has_fitted_bounds(&self) -> bool {
        self.bounds_fitted
    }

    fn restyle<F>(&mut self, id: MarkerId, style_for: F)
    where
        F: FnOnce(&RegisteredMarker) -> Option<marker::MarkerStyle>,
    {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if let Some(style) = self.registry.get(id).and_then(style_for) {
            surface.restyle_marker(id, style);
        }
    }
}

fn place<S: MapSurface>(
    surface: &mut S,
    registry: &mut MarkerRegistry,
    m: Marker,
    base_radius: f32,
) {
    let kind = m.kind.clone();
    let drawn_style = m.style;
    let popup = m.popup.clone();
    let id = surface.add_marker(m);
    registry.track(RegisteredMarker {
        id,
        kind,
        drawn_style,
        base_radius,
        popup,
    });
}

impl<S: MapSurface> Default for MapController<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MapSurface> Drop for MapController<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IncidentStatus, Severity};
    use crate::view::surface::recording::{RecordingSurface, SurfaceCall};
    use chrono::Utc;

    fn incident(id: &str, severity: Severity, lat: f64, lon: f64) -> Incident {
        Incident {
            id: id.into(),
            name: format!("{id} fire"),
            location: "Somewhere".into(),
            latitude: lat,
            longitude: lon,
            severity,
            status: IncidentStatus::Active,
            size_acres: Some(1200.0),
            containment_percent: Some(10.0),
            personnel_count: Some(40),
            start_date: Utc::now(),
            last_updated: Utc::now(),
            description: None,
        }
    }

    fn event(id: &str, lat: f64, lon: f64) -> SatelliteEventPoint {
        SatelliteEventPoint {
            id: id.into(),
            title: "Fire".into(),
            date: "2024-07-01T00:00:00Z".into(),
            lat,
            lon,
        }
    }

    fn mounted() -> MapController<RecordingSurface> {
        let mut controller = MapController::new();
        controller.mount(RecordingSurface::default());
        controller
    }

    #[test]
    fn mount_sets_initial_view() {
        let controller = mounted();
        assert_eq!(controller.state(), ControllerState::Initialized);
        assert_eq!(
            controller.surface().unwrap().calls,
            vec![SurfaceCall::SetView(INITIAL_VIEW)]
        );
    }

    #[test]
    fn render_before_mount_is_a_no_op() {
        let mut controller: MapController<RecordingSurface> = MapController::new();
        assert!(!controller.render(1, &MapData::default(), None));
        assert_eq!(controller.state(), ControllerState::Uninitialized);
    }

    #[test]
    fn redraw_replaces_all_markers() {
        let mut controller = mounted();
        let incidents = vec![
            incident("a", Severity::Critical, 38.0, -120.0),
            incident("b", Severity::Low, 39.0, -121.0),
        ];
        let events = vec![event("e1", 40.0, -119.0)];
        let data = MapData {
            incidents: &incidents,
            events: &events,
            ..Default::default()
        };

        assert!(controller.render(1, &data, None));
        assert!(!controller.render(1, &data, None));
        assert!(controller.render(2, &data, Some("a")));

        let surface = controller.surface().unwrap();
        assert_eq!(surface.markers.len(), 3);
        assert_eq!(surface.added_total, 6);
        let selected = surface
            .markers
            .values()
            .find(|m| m.kind == MarkerKind::Incident("a".into()))
            .unwrap();
        assert_eq!(selected.style.radius, 15.0 * marker::SELECTED_SCALE);
    }

    #[test]
    fn detections_are_drawn_after_events() {
        let mut controller = mounted();
        let events = vec![event("e1", 40.0, -119.0)];
        let detections = vec![ThermalDetectionPoint {
            lat: 40.0,
            lon: -119.0,
            brightness: 360.0,
            confidence: "high".into(),
            frp: 30.0,
            date: "2024-07-01".into(),
        }];
        let data = MapData {
            events: &events,
            detections: &detections,
            ..Default::default()
        };
        controller.render(1, &data, None);
        let kinds: Vec<_> = controller.markers().map(|m| m.kind.clone()).collect();
        assert_eq!(kinds, vec![MarkerKind::SatelliteEvent, MarkerKind::ThermalDetection]);
    }

    #[test]
    fn bounds_fit_happens_once_per_mount() {
        let mut controller = mounted();
        let events = vec![event("e1", 35.0, -120.0), event("e2", 50.0, -100.0)];

        assert!(!controller.fit_to_events(&events, true));
        assert!(!controller.fit_to_events(&[], false));
        assert!(controller.fit_to_events(&events, false));
        assert!(!controller.fit_to_events(&events, false));
        assert!(!controller.fit_to_events(&[event("e3", 60.0, -140.0)], false));

        let surface = controller.surface().unwrap();
        assert_eq!(surface.fit_count(), 1);
        assert!(surface.calls.contains(&SurfaceCall::FitBounds(
            BoundingBox::new(35.0, 50.0, -120.0, -100.0),
            FIT_PADDING_PX
        )));
    }

    #[test]
    fn selection_change_flies_once() {
        let mut controller = mounted();
        let a = incident("a", Severity::High, 38.5, -121.5);
        let b = incident("b", Severity::High, 45.0, -110.0);

        assert!(controller.sync_selection(Some(&a)));
        assert!(!controller.sync_selection(Some(&a)));
        assert!(controller.sync_selection(Some(&b)));
        assert!(!controller.sync_selection(None));

        let flights = controller.surface().unwrap().fly_tos();
        assert_eq!(
            flights,
            vec![
                CameraView {
                    center: a.coordinate(),
                    zoom: FLY_TO_ZOOM
                },
                CameraView {
                    center: b.coordinate(),
                    zoom: FLY_TO_ZOOM
                },
            ]
        );
    }

    #[test]
    fn hover_enlarges_and_mouse_out_restores() {
        let mut controller = mounted();
        let incidents = vec![
            incident("a", Severity::Medium, 38.0, -120.0),
            incident("b", Severity::Medium, 39.0, -120.0),
        ];
        let data = MapData {
            incidents: &incidents,
            ..Default::default()
        };
        controller.render(1, &data, Some("b"));
        let ids: Vec<_> = controller.markers().map(|m| m.id).collect();
        let radius = |controller: &MapController<RecordingSurface>, id| {
            controller.surface().unwrap().markers[&id].style.radius
        };

        controller.hover(Some(ids[0]));
        assert_eq!(radius(&controller, ids[0]), 10.0 * marker::HOVER_SCALE);
        controller.hover(None);
        assert_eq!(radius(&controller, ids[0]), 10.0);

        controller.hover(Some(ids[1]));
        assert_eq!(radius(&controller, ids[1]), 10.0 * marker::SELECTED_SCALE);
        controller.hover(None);
        assert_eq!(radius(&controller, ids[1]), 10.0 * marker::SELECTED_SCALE);
    }

    #[test]
    fn click_only_selects_incidents() {
        let mut controller = mounted();
        let incidents = vec![incident("a", Severity::Low, 38.0, -120.0)];
        let events = vec![event("e1", 40.0, -119.0)];
        let data = MapData {
            incidents: &incidents,
            events: &events,
            ..Default::default()
        };
        controller.render(1, &data, None);
        let ids: Vec<_> = controller.markers().map(|m| m.id).collect();
        assert_eq!(controller.click(ids[0]).as_deref(), Some("a"));
        assert_eq!(controller.click(ids[1]), None);
        assert_eq!(controller.popup(ids[1]).unwrap().footer.as_deref(), Some("Source: NASA EONET"));
    }

    #[test]
    fn unmount_releases_markers_and_surface() {
        let mut controller = mounted();
        let incidents = vec![incident("a", Severity::Low, 38.0, -120.0)];
        let events = vec![event("e1", 40.0, -119.0)];
        controller.render(
            1,
            &MapData {
                incidents: &incidents,
                events: &events,
                ..Default::default()
            },
            None,
        );
        controller.fit_to_events(&events, false);
        controller.unmount();

        assert_eq!(controller.state(), ControllerState::Uninitialized);
        assert_eq!(controller.markers().count(), 0);
        assert!(!controller.has_fitted_bounds());

        controller.mount(RecordingSurface::default());
        assert!(controller.fit_to_events(&events, false));
    }
}
