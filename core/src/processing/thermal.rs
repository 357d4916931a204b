use crate::geo::{normalize_longitude, BoundingBox, NORTH_AMERICA};
use crate::model::ThermalDetectionPoint;
use crate::prelude::{BatchMetadata, FeedAdapter, FeedBatch, FeedResult, FeedSource};
use crate::telemetry::log::LogManager;

/// Detections at or below this brightness (Kelvin) are treated as noise.
pub const BRIGHTNESS_FLOOR_K: f64 = 335.0;

const LATITUDE: usize = 0;
const LONGITUDE: usize = 1;
const BRIGHTNESS: usize = 2;
const DATE: usize = 5;
const CONFIDENCE: usize = 9;
const FRP: usize = 11;

enum Row {
    Qualifying(ThermalDetectionPoint),
    BelowFloor,
    Malformed,
}

/// Adapter for the near-real-time thermal anomaly CSV.
///
/// Rows are kept when brightness exceeds the floor and the point lies in the
/// configured region. When no row survives the region filter, every row that
/// passed the brightness floor is returned instead, so a region-shifted feed
/// never renders as an empty map.
pub struct ThermalFeedAdapter {
    brightness_floor: f64,
    region: BoundingBox,
    logger: LogManager,
}

impl ThermalFeedAdapter {
    pub fn new() -> Self {
        Self {
            brightness_floor: BRIGHTNESS_FLOOR_K,
            region: NORTH_AMERICA,
            logger: LogManager::new(FeedSource::ThermalDetections),
        }
    }

    pub fn with_brightness_floor(mut self, floor: f64) -> Self {
        self.brightness_floor = floor;
        self
    }

    pub fn with_region(mut self, region: BoundingBox) -> Self {
        self.region = region;
        self
    }

    fn parse_row(&self, line: &str) -> Row {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 2 {
            return Row::Malformed;
        }

        let lat = parse_number(fields[LATITUDE]);
        let lon = parse_number(fields[LONGITUDE]);
        let (Some(lat), Some(lon)) = (lat, lon) else {
            return Row::Malformed;
        };

        let brightness = field(&fields, BRIGHTNESS)
            .and_then(parse_number)
            .unwrap_or(0.0);
        if brightness <= self.brightness_floor {
            return Row::BelowFloor;
        }

        Row::Qualifying(ThermalDetectionPoint {
            lat,
            lon: normalize_longitude(lon),
            brightness,
            confidence: field(&fields, CONFIDENCE).unwrap_or_default().to_string(),
            frp: field(&fields, FRP).and_then(parse_number).unwrap_or(0.0),
            date: field(&fields, DATE).unwrap_or_default().to_string(),
        })
    }
}

impl Default for ThermalFeedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedAdapter for ThermalFeedAdapter {
    type Output = ThermalDetectionPoint;

    fn source(&self) -> FeedSource {
        FeedSource::ThermalDetections
    }

    fn normalize(&self, body: &str) -> FeedResult<FeedBatch<ThermalDetectionPoint>> {
        let mut metadata = BatchMetadata::default();
        let mut lines = body.lines().map(str::trim).filter(|line| !line.is_empty());

        // Header row.
        if lines.next().is_none() {
            return Ok(FeedBatch {
                points: Vec::new(),
                metadata,
            });
        }

        let mut qualifying = Vec::new();
        for line in lines {
            match self.parse_row(line) {
                Row::Qualifying(point) => qualifying.push(point),
                Row::BelowFloor => metadata.filtered += 1,
                Row::Malformed => metadata.skipped += 1,
            }
        }

        let region = self.region;
        let (regional, outside): (Vec<_>, Vec<_>) = qualifying
            .into_iter()
            .partition(|point| region.contains(point.lat, point.lon));

        let points = if regional.is_empty() && !outside.is_empty() {
            self.logger.warn(&format!(
                "no detections inside region, falling back to {} global points",
                outside.len()
            ));
            metadata.fallback_applied = true;
            metadata.notes.push("regional filter empty; global fallback".into());
            outside
        } else {
            metadata.filtered += outside.len();
            regional
        };

        if metadata.skipped > 0 {
            self.logger
                .warn(&format!("skipped {} malformed rows", metadata.skipped));
        }
        self.logger.record(&format!(
            "normalized {} detections ({} filtered)",
            points.len(),
            metadata.filtered
        ));

        Ok(FeedBatch { points, metadata })
    }
}

fn field<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    fields.get(index).map(|value| value.trim())
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}
