use crate::prelude::FeedSource;
use log::{info, warn};

/// Feed-tagged logger so interleaved refresh loops stay readable.
pub struct LogManager {
    tag: &'static str,
}

impl LogManager {
    pub fn new(source: FeedSource) -> Self {
        Self { tag: source.tag() }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.tag, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.tag, message);
    }
}
