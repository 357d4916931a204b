use crate::prelude::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Satellite,
    Ground,
    Aerial,
    WeatherStation,
}

impl SensorKind {
    pub fn label(self) -> &'static str {
        match self {
            SensorKind::Satellite => "satellite",
            SensorKind::Ground => "ground",
            SensorKind::Aerial => "aerial",
            SensorKind::WeatherStation => "weather_station",
        }
    }
}

/// Telemetry row from `fire_sensors`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sensor {
    pub id: String,
    pub sensor_type: SensorKind,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub detection_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoke_density: Option<f64>,
    pub is_active: bool,
}

impl Sensor {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}
