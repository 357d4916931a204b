//! Page-level state shared by the map and the sidebar.

use crate::model::{
    ApproximateLocation, DashboardSnapshot, FeedStatus, Incident, SatelliteEventPoint, Sensor,
    SourceSnapshot, ThermalDetectionPoint, UserReport,
};
use crate::prelude::FeedSource;
use crate::processing::extract_fire_locations;
use crate::view::controller::{MapController, MapData};
use crate::view::sidebar::SidebarModel;
use crate::view::surface::{MapSurface, MarkerId};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Latest data for one source as the page sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceState<T> {
    pub data: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for SourceState<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

impl<T: Clone + PartialEq> SourceState<T> {
    /// Returns whether the displayed data changed and, for a newly seen failure, its message.
    fn apply(&mut self, slice: &SourceSnapshot<T>) -> (bool, Option<String>) {
        match &slice.status {
            FeedStatus::Pending => {
                self.loading = true;
                (false, None)
            }
            FeedStatus::Ready => {
                self.loading = false;
                self.error = None;
                if self.data == slice.data {
                    (false, None)
                } else {
                    self.data = slice.data.clone();
                    (true, None)
                }
            }
            FeedStatus::Failed(message) => {
                self.loading = false;
                // The slice still carries the last good data; an empty one never blanks the layer.
                let changed = !slice.data.is_empty() && self.data != slice.data;
                if changed {
                    self.data = slice.data.clone();
                }
                if self.error.as_deref() == Some(message.as_str()) {
                    return (changed, None);
                }
                self.error = Some(message.clone());
                (changed, Some(message.clone()))
            }
        }
    }
}

/// Non-blocking, user-visible failure message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub source: FeedSource,
    pub title: String,
    pub description: String,
}

impl Notice {
    fn for_failure(source: FeedSource, message: &str) -> Self {
        let (title, description) = match source {
            FeedSource::SatelliteEvents => (
                "Wildfire Data Unavailable".to_string(),
                "Unable to load NASA wildfire data. Map will continue with local data.".to_string(),
            ),
            FeedSource::ThermalDetections => (
                "FIRMS Data Unavailable".to_string(),
                "Unable to load NASA FIRMS wildfire detections.".to_string(),
            ),
            FeedSource::Incidents => ("Incidents unavailable".to_string(), message.to_string()),
            FeedSource::Sensors => ("Sensors unavailable".to_string(), message.to_string()),
            FeedSource::Reports => ("Reports unavailable".to_string(), message.to_string()),
        };
        Self {
            source,
            title,
            description,
        }
    }
}

/// Owns everything the dashboard page displays.
///
/// Selection is a single value written by both marker clicks and sidebar
/// clicks; the last write wins. `revision` advances whenever anything the map
/// draws changes, which is what triggers a full redraw.
#[derive(Debug, Default)]
pub struct DashboardPage {
    pub incidents: SourceState<Incident>,
    pub sensors: SourceState<Sensor>,
    pub reports: SourceState<UserReport>,
    pub events: SourceState<SatelliteEventPoint>,
    pub detections: SourceState<ThermalDetectionPoint>,
    selected: Option<String>,
    revision: u64,
    notices: Vec<Notice>,
}

impl DashboardPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn apply_snapshot(&mut self, snapshot: &DashboardSnapshot) {
        self.apply_incidents(&snapshot.incidents);
        self.apply_sensors(&snapshot.sensors);
        self.apply_reports(&snapshot.reports);
        self.apply_events(&snapshot.events);
        self.apply_detections(&snapshot.detections);
    }

    pub fn apply_incidents(&mut self, slice: &SourceSnapshot<Incident>) {
        let outcome = self.incidents.apply(slice);
        self.settle(FeedSource::Incidents, outcome);
    }

    pub fn apply_sensors(&mut self, slice: &SourceSnapshot<Sensor>) {
        let outcome = self.sensors.apply(slice);
        self.settle(FeedSource::Sensors, outcome);
    }

    pub fn apply_reports(&mut self, slice: &SourceSnapshot<UserReport>) {
        let outcome = self.reports.apply(slice);
        self.settle(FeedSource::Reports, outcome);
    }

    pub fn apply_events(&mut self, slice: &SourceSnapshot<SatelliteEventPoint>) {
        let outcome = self.events.apply(slice);
        self.settle(FeedSource::SatelliteEvents, outcome);
    }

    pub fn apply_detections(&mut self, slice: &SourceSnapshot<ThermalDetectionPoint>) {
        let outcome = self.detections.apply(slice);
        self.settle(FeedSource::ThermalDetections, outcome);
    }

    fn settle(&mut self, source: FeedSource, (changed, failure): (bool, Option<String>)) {
        if changed {
            self.revision += 1;
            debug!("[{source}] data changed, revision {}", self.revision);
        }
        if let Some(message) = failure {
            warn!("[{source}] fetch failed: {message}");
            self.notices.push(Notice::for_failure(source, &message));
        }
    }

    pub fn select(&mut self, incident_id: &str) {
        if self.selected.as_deref() == Some(incident_id) {
            return;
        }
        self.selected = Some(incident_id.to_string());
        self.revision += 1;
    }

    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.revision += 1;
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_incident(&self) -> Option<&Incident> {
        let id = self.selected.as_deref()?;
        self.incidents.data.iter().find(|incident| incident.id == id)
    }

    /// Routes a marker click; incident markers update the selection.
    pub fn handle_marker_click<S: MapSurface>(
        &mut self,
        map: &MapController<S>,
        id: MarkerId,
    ) -> bool {
        match map.click(id) {
            Some(incident_id) => {
                self.select(&incident_id);
                true
            }
            None => false,
        }
    }

    /// Pushes the current page state into the map controller.
    pub fn sync<S: MapSurface>(&self, map: &mut MapController<S>) {
        let data = MapData {
            incidents: &self.incidents.data,
            sensors: &self.sensors.data,
            reports: &self.reports.data,
            events: &self.events.data,
            detections: &self.detections.data,
        };
        map.render(self.revision, &data, self.selected.as_deref());
        map.fit_to_events(&self.events.data, self.events.loading);
        map.sync_selection(self.selected_incident());
    }

    pub fn sidebar(&self) -> SidebarModel {
        SidebarModel::build(
            &self.incidents.data,
            &self.detections.data,
            self.selected.as_deref(),
        )
    }

    pub fn fire_locations(&self) -> Vec<ApproximateLocation> {
        extract_fire_locations(&self.events.data, &self.detections.data)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IncidentStatus, SensorKind, Severity};
    use crate::view::marker::MarkerKind;
    use crate::view::surface::recording::RecordingSurface;
    use crate::view::surface::{CameraView, FLY_TO_ZOOM};
    use chrono::Utc;

    fn incident(id: &str, lat: f64, lon: f64) -> Incident {
        Incident {
            id: id.into(),
            name: format!("{id} fire"),
            location: "Butte County, CA".into(),
            latitude: lat,
            longitude: lon,
            severity: Severity::High,
            status: IncidentStatus::Active,
            size_acres: None,
            containment_percent: None,
            personnel_count: None,
            start_date: Utc::now(),
            last_updated: Utc::now(),
            description: None,
        }
    }

    fn event(id: &str, lat: f64, lon: f64) -> SatelliteEventPoint {
        SatelliteEventPoint {
            id: id.into(),
            title: "Wildfire in Kamloops, British Columbia, Canada".into(),
            date: "2024-07-01T00:00:00Z".into(),
            lat,
            lon,
        }
    }

    fn sensor(id: &str, active: bool) -> Sensor {
        Sensor {
            id: id.into(),
            sensor_type: SensorKind::Ground,
            name: format!("station {id}"),
            latitude: 39.0,
            longitude: -121.0,
            detection_time: Utc::now(),
            confidence_level: Some(90.0),
            temperature_celsius: None,
            smoke_density: None,
            is_active: active,
        }
    }

    fn ready<T>(data: Vec<T>) -> SourceSnapshot<T> {
        let mut slice = SourceSnapshot::default();
        slice.succeed(data);
        slice
    }

    fn page_with_incidents() -> DashboardPage {
        let mut page = DashboardPage::new();
        page.apply_incidents(&ready(vec![
            incident("a", 39.7, -121.6),
            incident("b", 34.2, -118.1),
        ]));
        page
    }

    fn mounted() -> MapController<RecordingSurface> {
        let mut map = MapController::new();
        map.mount(RecordingSurface::default());
        map
    }

    fn incident_marker(map: &MapController<RecordingSurface>, id: &str) -> MarkerId {
        map.markers()
            .find(|m| m.kind == MarkerKind::Incident(id.into()))
            .map(|m| m.id)
            .unwrap()
    }

    #[test]
    fn marker_click_flies_exactly_once() {
        let mut page = page_with_incidents();
        let mut map = mounted();
        page.sync(&mut map);

        let clicked = incident_marker(&map, "a");
        assert!(page.handle_marker_click(&map, clicked));
        page.sync(&mut map);
        page.sync(&mut map);

        assert_eq!(
            map.surface().unwrap().fly_tos(),
            vec![CameraView {
                center: page.incidents.data[0].coordinate(),
                zoom: FLY_TO_ZOOM,
            }]
        );
    }

    #[test]
    fn sidebar_click_flies_exactly_once() {
        let mut page = page_with_incidents();
        let mut map = mounted();
        page.sync(&mut map);

        page.select("b");
        page.sync(&mut map);
        page.select("b");
        page.sync(&mut map);

        let flights = map.surface().unwrap().fly_tos();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].center, page.incidents.data[1].coordinate());
        assert!(page.sidebar().contained.is_empty());
    }

    #[test]
    fn bounds_fit_at_most_once_across_refetches() {
        let mut page = DashboardPage::new();
        let mut map = mounted();

        page.sync(&mut map);
        page.apply_events(&ready(vec![event("e1", 50.6, -120.3)]));
        page.sync(&mut map);
        page.apply_events(&ready(vec![
            event("e1", 50.6, -120.3),
            event("e2", 45.0, -110.0),
        ]));
        page.sync(&mut map);

        assert_eq!(map.surface().unwrap().fit_count(), 1);
    }

    #[test]
    fn revision_only_moves_when_data_changes() {
        let mut page = page_with_incidents();
        let start = page.revision();
        page.apply_incidents(&ready(vec![
            incident("a", 39.7, -121.6),
            incident("b", 34.2, -118.1),
        ]));
        assert_eq!(page.revision(), start);

        page.apply_detections(&ready(vec![ThermalDetectionPoint {
            lat: 40.0,
            lon: -120.0,
            brightness: 360.0,
            confidence: "high".into(),
            frp: 20.0,
            date: "2024-07-01".into(),
        }]));
        assert_eq!(page.revision(), start + 1);
    }

    #[test]
    fn failures_raise_one_notice_and_keep_data() {
        let mut page = DashboardPage::new();
        page.apply_events(&ready(vec![event("e1", 50.6, -120.3)]));

        let mut failed = ready(vec![event("e1", 50.6, -120.3)]);
        failed.fail("503 from eonet");
        page.apply_events(&failed);
        page.apply_events(&failed);

        let mut thermal = SourceSnapshot::<ThermalDetectionPoint>::default();
        thermal.fail("timeout");
        page.apply_detections(&thermal);

        let notices = page.take_notices();
        let titles: Vec<_> = notices.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Wildfire Data Unavailable", "FIRMS Data Unavailable"]);
        assert_eq!(page.events.data.len(), 1);
        assert!(!page.events.loading);
        assert!(page.take_notices().is_empty());
    }

    #[test]
    fn failed_slice_with_stale_data_is_displayed() {
        let mut page = DashboardPage::new();
        let start = page.revision();

        let mut failed = ready(vec![event("e1", 50.6, -120.3)]);
        failed.fail("503 from eonet");
        page.apply_events(&failed);

        assert_eq!(page.events.data.len(), 1);
        assert_eq!(page.revision(), start + 1);
        assert_eq!(page.take_notices().len(), 1);

        let mut emptied = SourceSnapshot::<SatelliteEventPoint>::default();
        emptied.fail("503 from eonet");
        page.apply_events(&emptied);
        assert_eq!(page.events.data.len(), 1);
        assert_eq!(page.revision(), start + 1);
        assert!(page.take_notices().is_empty());
    }

    #[test]
    fn merged_sensor_insert_redraws_once() {
        let mut page = DashboardPage::new();
        page.apply_sensors(&ready(vec![sensor("s1", true)]));
        let start = page.revision();

        let merged = ready(vec![sensor("s2", true), sensor("s1", true)]);
        page.apply_sensors(&merged);
        page.apply_sensors(&merged);

        let ids: Vec<_> = page.sensors.data.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1"]);
        assert_eq!(page.revision(), start + 1);
    }

    #[test]
    fn fire_locations_come_from_event_titles() {
        let mut page = DashboardPage::new();
        page.apply_events(&ready(vec![event("e1", 50.6, -120.3)]));
        let locations = page.fire_locations();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].city.as_deref(), Some("Kamloops"));
    }
}
