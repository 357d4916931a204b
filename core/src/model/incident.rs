use crate::prelude::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity as labelled by the data source. Independent of [`IncidentStatus`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Active,
    Contained,
    Controlled,
    Monitored,
}

/// Official, named wildfire event as stored in `fire_incidents`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    pub id: String,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: Severity,
    pub status: IncidentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_acres: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containment_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personnel_count: Option<u32>,
    pub start_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Incident {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn is_active(&self) -> bool {
        self.status == IncidentStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_row_deserializes_with_optional_columns_missing() {
        let row = r#"{
            "id": "inc-1",
            "name": "Creek Fire",
            "location": "Fresno County, CA",
            "latitude": 37.2,
            "longitude": -119.3,
            "severity": "critical",
            "status": "contained",
            "start_date": "2024-09-01T12:00:00Z",
            "last_updated": "2024-09-03T08:30:00Z"
        }"#;

        let incident: Incident = serde_json::from_str(row).unwrap();
        assert_eq!(incident.severity, Severity::Critical);
        assert_eq!(incident.status, IncidentStatus::Contained);
        assert!(!incident.is_active());
        assert_eq!(incident.size_acres, None);
        assert_eq!(incident.coordinate(), Coordinate::new(37.2, -119.3));
    }
}
