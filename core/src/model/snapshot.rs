use crate::model::{Incident, SatelliteEventPoint, Sensor, ThermalDetectionPoint, UserReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fetch state of one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum FeedStatus {
    /// No fetch has completed yet.
    #[default]
    Pending,
    Ready,
    /// The latest fetch failed; `data` still holds the last good result.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub status: FeedStatus,
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for SourceSnapshot<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            status: FeedStatus::Pending,
            fetched_at: None,
        }
    }
}

impl<T> SourceSnapshot<T> {
    pub fn succeed(&mut self, data: Vec<T>) {
        self.data = data;
        self.status = FeedStatus::Ready;
        self.fetched_at = Some(Utc::now());
    }

    /// Records a failure without discarding the last good data.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = FeedStatus::Failed(message.into());
    }

    pub fn is_pending(&self) -> bool {
        self.status == FeedStatus::Pending
    }
}

/// Everything the dashboard renders, one independently-updated slice per source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    #[serde(default)]
    pub incidents: SourceSnapshot<Incident>,
    #[serde(default)]
    pub sensors: SourceSnapshot<Sensor>,
    #[serde(default)]
    pub reports: SourceSnapshot<UserReport>,
    #[serde(default)]
    pub events: SourceSnapshot<SatelliteEventPoint>,
    #[serde(default)]
    pub detections: SourceSnapshot<ThermalDetectionPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_previous_data() {
        let mut slice = SourceSnapshot::default();
        slice.succeed(vec![1, 2, 3]);
        slice.fail("timeout");
        assert_eq!(slice.data, vec![1, 2, 3]);
        assert_eq!(slice.status, FeedStatus::Failed("timeout".into()));
    }

    #[test]
    fn status_serializes_with_message() {
        let json = serde_json::to_string(&FeedStatus::Failed("503".into())).unwrap();
        assert_eq!(json, r#"{"state":"failed","message":"503"}"#);
        let ready: FeedStatus = serde_json::from_str(r#"{"state":"ready"}"#).unwrap();
        assert_eq!(ready, FeedStatus::Ready);
    }
}
