use crate::prelude::Coordinate;
use serde::{Deserialize, Serialize};

/// One (event, geometry) pair from the open-events feed.
///
/// `id` is `<event id>-<geometry date>`; it is only unique within one fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SatelliteEventPoint {
    pub id: String,
    pub title: String,
    pub date: String,
    pub lat: f64,
    pub lon: f64,
}

impl SatelliteEventPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Near-real-time thermal anomaly. Has no identity beyond its position in the feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalDetectionPoint {
    pub lat: f64,
    pub lon: f64,
    /// Brightness temperature in Kelvin.
    pub brightness: f64,
    /// Categorical label passed through from the feed (e.g. "low", "nominal", "high").
    pub confidence: String,
    /// Fire radiative power in megawatts.
    pub frp: f64,
    pub date: String,
}

impl ThermalDetectionPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}
