use crate::prelude::Coordinate;
use serde::{Deserialize, Serialize};

/// Axis-aligned lat/lon box. All four edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// United States, Canada and Alaska, from southern Florida to Newfoundland.
pub const NORTH_AMERICA: BoundingBox = BoundingBox::new(24.0, 83.0, -168.0, -52.0);

impl BoundingBox {
    pub const fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        points.into_iter().fold(None, |acc, point| {
            Some(match acc {
                None => Self::new(point.lat, point.lat, point.lon, point.lon),
                Some(b) => Self::new(
                    b.min_lat.min(point.lat),
                    b.max_lat.max(point.lat),
                    b.min_lon.min(point.lon),
                    b.max_lon.max(point.lon),
                ),
            })
        })
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// Maps a longitude in the [0, 360) convention onto [-180, 180].
///
/// Values already in [-180, 180] are returned unchanged.
pub fn normalize_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// Pure containment check. Callers normalize longitude and reject NaN first.
pub fn is_in_region(lat: f64, lon: f64, region: &BoundingBox) -> bool {
    region.contains(lat, lon)
}
