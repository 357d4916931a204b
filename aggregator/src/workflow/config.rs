use anyhow::{bail, Context};
use guardcore::feed::RefreshPolicy;
use guardcore::processing::BRIGHTNESS_FLOOR_K;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_THERMAL_URL: &str =
    "https://firms.modaps.eosdis.nasa.gov/api/area/csv/{map_key}/VIIRS_NOAA20_NRT/world/3";
pub const DEFAULT_EVENTS_URL: &str =
    "https://eonet.gsfc.nasa.gov/api/v3/events?category=wildfires&status=open&limit=100";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_REPORT_BUCKET: &str = "fire-reports";

const MAP_KEY_ENV: &str = "FIRMS_MAP_KEY";
const API_KEY_ENV: &str = "BACKEND_API_KEY";
const MAP_KEY_PLACEHOLDER: &str = "{map_key}";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub thermal_url: String,
    pub map_key: Option<String>,
    pub events_url: String,
    pub brightness_floor: f64,
    pub refetch_interval_secs: u64,
    pub stale_after_secs: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            thermal_url: DEFAULT_THERMAL_URL.to_string(),
            map_key: None,
            events_url: DEFAULT_EVENTS_URL.to_string(),
            brightness_floor: BRIGHTNESS_FLOOR_K,
            refetch_interval_secs: 300,
            stale_after_secs: 120,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_report_bucket")]
    pub report_bucket: String,
    #[serde(default = "default_realtime_poll_secs")]
    pub realtime_poll_secs: u64,
}

fn default_report_bucket() -> String {
    DEFAULT_REPORT_BUCKET.to_string()
}

fn default_realtime_poll_secs() -> u64 {
    10
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub feeds: FeedsConfig,
    pub backend: Option<BackendConfig>,
    pub geocoder_url: String,
    pub bind: SocketAddr,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            feeds: FeedsConfig::default(),
            backend: None,
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

impl DashboardConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading dashboard config {}", path_ref.display()))?;
        let config: DashboardConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing dashboard config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        backend_url: Option<String>,
        bind: Option<SocketAddr>,
        refetch_interval_secs: Option<u64>,
    ) -> Self {
        let mut config = Self::default();
        config.backend = backend_url.map(|url| BackendConfig {
            url,
            api_key: None,
            report_bucket: default_report_bucket(),
            realtime_poll_secs: default_realtime_poll_secs(),
        });
        if let Some(bind) = bind {
            config.bind = bind;
        }
        if let Some(secs) = refetch_interval_secs {
            config.feeds.refetch_interval_secs = secs;
        }
        config
    }

    /// Fills secrets missing from the file from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.feeds.map_key.is_none() {
            self.feeds.map_key = lookup(MAP_KEY_ENV);
        }
        if let Some(backend) = self.backend.as_mut() {
            if backend.api_key.is_none() {
                backend.api_key = lookup(API_KEY_ENV);
            }
        }
        self
    }

    /// Thermal feed URL with the map key substituted.
    pub fn thermal_feed_url(&self) -> anyhow::Result<String> {
        let template = &self.feeds.thermal_url;
        if !template.contains(MAP_KEY_PLACEHOLDER) {
            return Ok(template.clone());
        }
        match self.feeds.map_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {
                Ok(template.replace(MAP_KEY_PLACEHOLDER, key.trim()))
            }
            _ => bail!("thermal feed needs a map key (feeds.map_key or {MAP_KEY_ENV})"),
        }
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            refetch_interval: Duration::from_secs(self.feeds.refetch_interval_secs.max(1)),
            stale_after: Duration::from_secs(self.feeds.stale_after_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_published_feeds() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.feeds.brightness_floor, 335.0);
        assert_eq!(cfg.refresh_policy(), RefreshPolicy::default());
        assert_eq!(cfg.bind.port(), 9000);
        assert!(cfg.backend.is_none());
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"feeds:\n  map_key: abc123\n  refetch_interval_secs: 60\nbackend:\n  url: http://localhost:54321\nbind: 127.0.0.1:9100\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = DashboardConfig::load(&path).unwrap();

        assert_eq!(cfg.feeds.refetch_interval_secs, 60);
        assert_eq!(cfg.feeds.stale_after_secs, 120);
        assert_eq!(cfg.bind.port(), 9100);
        let backend = cfg.backend.as_ref().unwrap();
        assert_eq!(backend.report_bucket, "fire-reports");
        assert_eq!(backend.realtime_poll_secs, 10);
        assert_eq!(
            cfg.thermal_feed_url().unwrap(),
            "https://firms.modaps.eosdis.nasa.gov/api/area/csv/abc123/VIIRS_NOAA20_NRT/world/3"
        );
    }

    #[test]
    fn env_fills_only_missing_secrets() {
        let cfg = DashboardConfig::from_args(Some("http://backend".into()), None, None)
            .with_env_from(|name| match name {
                "FIRMS_MAP_KEY" => Some("from-env".into()),
                "BACKEND_API_KEY" => Some("secret".into()),
                _ => None,
            });
        assert_eq!(cfg.feeds.map_key.as_deref(), Some("from-env"));
        assert_eq!(
            cfg.backend.unwrap().api_key.as_deref(),
            Some("secret")
        );
    }

    #[test]
    fn missing_map_key_is_reported() {
        let cfg = DashboardConfig::default().with_env_from(|_| None);
        assert!(cfg.thermal_feed_url().is_err());
    }
}
