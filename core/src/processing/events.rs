use crate::geo::{BoundingBox, NORTH_AMERICA};
use crate::model::SatelliteEventPoint;
use crate::prelude::{BatchMetadata, FeedAdapter, FeedBatch, FeedError, FeedResult, FeedSource};
use crate::telemetry::log::LogManager;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct EventsDocument {
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    geometry: Vec<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(default)]
    date: String,
    /// `[lon, lat]` for point geometries. Anything else is skipped.
    #[serde(default)]
    coordinates: Value,
}

impl RawGeometry {
    fn lon_lat(&self) -> Option<(f64, f64)> {
        match self.coordinates.as_array()?.as_slice() {
            [lon, lat, ..] => Some((lon.as_f64()?, lat.as_f64()?)),
            _ => None,
        }
    }
}

/// Adapter for the open wildfire-events JSON feed.
///
/// Each (event, geometry) pair becomes one point. The feed already uses the
/// [-180, 180] longitude convention and an empty result is valid.
pub struct EventFeedAdapter {
    region: BoundingBox,
    logger: LogManager,
}

impl EventFeedAdapter {
    pub fn new() -> Self {
        Self {
            region: NORTH_AMERICA,
            logger: LogManager::new(FeedSource::SatelliteEvents),
        }
    }

    pub fn with_region(mut self, region: BoundingBox) -> Self {
        self.region = region;
        self
    }
}

impl Default for EventFeedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedAdapter for EventFeedAdapter {
    type Output = SatelliteEventPoint;

    fn source(&self) -> FeedSource {
        FeedSource::SatelliteEvents
    }

    fn normalize(&self, body: &str) -> FeedResult<FeedBatch<SatelliteEventPoint>> {
        let document: EventsDocument =
            serde_json::from_str(body).map_err(|err| FeedError::Decode(err.to_string()))?;

        let mut metadata = BatchMetadata::default();
        let mut points = Vec::new();

        for event in &document.events {
            for geometry in &event.geometry {
                let Some((lon, lat)) = geometry.lon_lat() else {
                    metadata.skipped += 1;
                    continue;
                };
                if !self.region.contains(lat, lon) {
                    metadata.filtered += 1;
                    continue;
                }
                points.push(SatelliteEventPoint {
                    id: format!("{}-{}", event.id, geometry.date),
                    title: event.title.clone(),
                    date: geometry.date.clone(),
                    lat,
                    lon,
                });
            }
        }

        self.logger.record(&format!(
            "{} events flattened to {} points ({} outside region, {} skipped)",
            document.events.len(),
            points.len(),
            metadata.filtered,
            metadata.skipped
        ));

        Ok(FeedBatch { points, metadata })
    }
}
