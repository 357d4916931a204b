use crate::prelude::{BatchMetadata, FeedSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Counters for one feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMetrics {
    pub refreshes: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub fallbacks: usize,
}

pub struct MetricsRecorder {
    inner: Mutex<BTreeMap<&'static str, FeedMetrics>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn record_batch(&self, source: FeedSource, points: usize, metadata: &BatchMetadata) {
        self.update(source, |m| {
            m.refreshes += 1;
            m.processed += points;
            m.skipped += metadata.skipped;
            if metadata.fallback_applied {
                m.fallbacks += 1;
            }
        });
    }

    pub fn record_error(&self, source: FeedSource) {
        self.update(source, |m| m.errors += 1);
    }

    pub fn snapshot(&self) -> BTreeMap<String, FeedMetrics> {
        if let Ok(metrics) = self.inner.lock() {
            metrics
                .iter()
                .map(|(tag, m)| (tag.to_string(), *m))
                .collect()
        } else {
            BTreeMap::new()
        }
    }

    fn update(&self, source: FeedSource, apply: impl FnOnce(&mut FeedMetrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(metrics.entry(source.tag()).or_default());
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
