use crate::prelude::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verification state of a crowd-sourced report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Pending,
    Verified,
    FalsePositive,
    Duplicate,
    /// Any value the backend adds later. Rendered like `Pending`.
    #[serde(other)]
    Other,
}

/// Row from `fire_reports`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserReport {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub has_visible_smoke: bool,
    #[serde(default)]
    pub has_visible_flames: bool,
    #[serde(default)]
    pub has_smell: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_urls: Option<Vec<String>>,
    #[serde(default)]
    pub report_status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

impl UserReport {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Insert payload for `fire_reports`; the backend assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewReport {
    pub latitude: f64,
    pub longitude: f64,
    pub description: String,
    pub has_visible_smoke: bool,
    pub has_visible_flames: bool,
    pub has_smell: bool,
    pub photo_urls: Option<Vec<String>>,
    pub report_status: ReportStatus,
}

/// Binary attachment sent with a report submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    /// Base64 (standard alphabet) on the wire.
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

impl PhotoUpload {
    /// Extension of the original file name, used to name the stored object.
    pub fn extension(&self) -> Option<&str> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

/// What the reporting form posts to the aggregator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportSubmission {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub has_visible_smoke: bool,
    #[serde(default)]
    pub has_visible_flames: bool,
    #[serde(default)]
    pub has_smell: bool,
    /// Free-text address, resolved by the address-search service when non-blank.
    #[serde(default)]
    pub address: Option<String>,
    /// Position reported by the device, used when no address is given.
    #[serde(default)]
    pub device_location: Option<Coordinate>,
    #[serde(default)]
    pub photo: Option<PhotoUpload>,
}

impl ReportSubmission {
    pub fn address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
    }
}
