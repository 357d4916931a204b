//! Sidebar content derived from the current page data.

use crate::geo::name_location;
use crate::model::{Incident, Severity, ThermalDetectionPoint};
use crate::view::marker::group_thousands;
use serde::{Deserialize, Serialize};

/// Detection cards shown before the overflow note.
pub const MAX_DETECTION_CARDS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCard {
    pub place: String,
    pub coordinates: String,
    pub brightness: String,
    pub frp: String,
    pub date: String,
    pub confidence: String,
    pub badge: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentCard {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub location: String,
    pub started: String,
    pub size: String,
    pub containment: String,
    pub personnel: String,
    pub is_selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SidebarModel {
    pub active_count: usize,
    pub contained_count: usize,
    pub detections: Vec<DetectionCard>,
    pub overflow_note: Option<String>,
    pub contained: Vec<IncidentCard>,
}

impl SidebarModel {
    pub fn build(
        incidents: &[Incident],
        detections: &[ThermalDetectionPoint],
        selected: Option<&str>,
    ) -> Self {
        let contained: Vec<IncidentCard> = incidents
            .iter()
            .filter(|incident| !incident.is_active())
            .map(|incident| incident_card(incident, selected == Some(incident.id.as_str())))
            .collect();

        let overflow_note = (detections.len() > MAX_DETECTION_CARDS).then(|| {
            format!(
                "Showing {MAX_DETECTION_CARDS} of {} detections",
                detections.len()
            )
        });

        Self {
            active_count: detections.len(),
            contained_count: contained.len(),
            detections: detections
                .iter()
                .take(MAX_DETECTION_CARDS)
                .map(detection_card)
                .collect(),
            overflow_note,
            contained,
        }
    }
}

/// Badge severity for a detection, banded on fire radiative power (MW).
pub fn frp_badge(frp: f64) -> Severity {
    if frp >= 100.0 {
        Severity::Critical
    } else if frp >= 50.0 {
        Severity::High
    } else if frp >= 10.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn detection_card(detection: &ThermalDetectionPoint) -> DetectionCard {
    DetectionCard {
        place: name_location(detection.lat, detection.lon),
        coordinates: format!("{:.4}, {:.4}", detection.lat, detection.lon),
        brightness: format!("{:.1}K", detection.brightness),
        frp: format!("{:.1} MW", detection.frp),
        date: detection.date.clone(),
        confidence: detection.confidence.clone(),
        badge: frp_badge(detection.frp),
    }
}

fn incident_card(incident: &Incident, is_selected: bool) -> IncidentCard {
    IncidentCard {
        id: incident.id.clone(),
        name: incident.name.clone(),
        severity: incident.severity,
        location: incident.location.clone(),
        started: incident.start_date.format("%Y-%m-%d").to_string(),
        size: incident
            .size_acres
            .map(|acres| format!("{} acres", group_thousands(acres)))
            .unwrap_or_else(|| "N/A".into()),
        containment: format!("{}%", incident.containment_percent.unwrap_or(0.0)),
        personnel: incident
            .personnel_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "N/A".into()),
        is_selected,
    }
}
