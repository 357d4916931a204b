use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// The independent data sources fused on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    Incidents,
    Sensors,
    Reports,
    SatelliteEvents,
    ThermalDetections,
}

impl FeedSource {
    pub const ALL: [FeedSource; 5] = [
        FeedSource::Incidents,
        FeedSource::Sensors,
        FeedSource::Reports,
        FeedSource::SatelliteEvents,
        FeedSource::ThermalDetections,
    ];

    /// Short tag used in log lines and metric keys.
    pub fn tag(self) -> &'static str {
        match self {
            FeedSource::Incidents => "incidents",
            FeedSource::Sensors => "sensors",
            FeedSource::Reports => "reports",
            FeedSource::SatelliteEvents => "events",
            FeedSource::ThermalDetections => "thermal",
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Result of normalizing one feed body.
#[derive(Debug, Clone)]
pub struct FeedBatch<T> {
    pub points: Vec<T>,
    pub metadata: BatchMetadata,
}

/// Bookkeeping collected while normalizing, used for logging and metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMetadata {
    /// Records dropped because they could not be parsed.
    pub skipped: usize,
    /// Records that parsed but were filtered out (threshold or region).
    pub filtered: usize,
    /// Set when the regional filter emptied the feed and the unfiltered set was returned.
    pub fallback_applied: bool,
    pub notes: Vec<String>,
}

/// Common error type for feed acquisition and normalization.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("could not decode feed: {0}")]
    Decode(String),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type FeedResult<T> = Result<T, FeedError>;

/// Trait implemented by each satellite feed adapter.
///
/// Adapters are pure: they receive the raw response body and return the
/// normalized points. Fetching is left to the caller.
pub trait FeedAdapter {
    type Output;

    fn source(&self) -> FeedSource;
    fn normalize(&self, body: &str) -> FeedResult<FeedBatch<Self::Output>>;
}
