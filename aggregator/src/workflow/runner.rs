use crate::gui_bridge::model::{read_snapshot, update_snapshot, SharedSnapshot};
use crate::report::{submit_report, ReportError, ReportSink};
use crate::sources::{fetch_events_json, fetch_thermal_csv, BackendClient, Direction, Geocoder, RowQuery};
use crate::workflow::config::DashboardConfig;
use anyhow::Context;
use guardcore::feed::QueryCache;
use guardcore::model::{
    ApproximateLocation, DashboardSnapshot, Incident, ReportSubmission, SatelliteEventPoint,
    Sensor, SourceSnapshot, ThermalDetectionPoint, UserReport,
};
use guardcore::prelude::{FeedAdapter, FeedBatch, FeedError, FeedResult, FeedSource};
use guardcore::processing::{extract_fire_locations, EventFeedAdapter, ThermalFeedAdapter};
use guardcore::telemetry::{FeedMetrics, LogManager, MetricsRecorder};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub const INCIDENTS_COLLECTION: &str = "fire_incidents";
pub const SENSORS_COLLECTION: &str = "fire_sensors";
pub const REPORTS_COLLECTION: &str = crate::report::submit::REPORTS_COLLECTION;

/// Outcome of normalizing feed bodies without touching the network.
pub struct OfflineSummary {
    pub detections: usize,
    pub events: usize,
    pub skipped: usize,
    pub fallback_applied: bool,
    pub locations: Vec<ApproximateLocation>,
}

struct FeedCaches {
    thermal: QueryCache<Vec<ThermalDetectionPoint>>,
    events: QueryCache<Vec<SatelliteEventPoint>>,
    incidents: QueryCache<Vec<Incident>>,
    sensors: QueryCache<Vec<Sensor>>,
    reports: QueryCache<Vec<UserReport>>,
}

/// Fetches, normalizes and publishes every source into one shared snapshot.
pub struct Runner {
    config: DashboardConfig,
    http: reqwest::Client,
    thermal_url: Option<String>,
    thermal: ThermalFeedAdapter,
    events: EventFeedAdapter,
    backend: Option<BackendClient>,
    geocoder: Geocoder,
    caches: FeedCaches,
    metrics: MetricsRecorder,
    snapshot: SharedSnapshot,
}

impl Runner {
    pub fn new(config: DashboardConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("guardgrid-aggregator/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;

        let thermal_url = match config.thermal_feed_url() {
            Ok(url) => Some(url),
            Err(err) => {
                LogManager::new(FeedSource::ThermalDetections).warn(&err.to_string());
                None
            }
        };
        let backend = config.backend.as_ref().map(|backend| {
            BackendClient::new(http.clone(), &backend.url, backend.api_key.clone())
        });
        let policy = config.refresh_policy();

        let mut snapshot = DashboardSnapshot::default();
        if backend.is_none() {
            // Nothing will ever arrive for these; show them as loaded and empty.
            snapshot.incidents.succeed(Vec::new());
            snapshot.sensors.succeed(Vec::new());
            snapshot.reports.succeed(Vec::new());
        }

        Ok(Self {
            thermal: ThermalFeedAdapter::new().with_brightness_floor(config.feeds.brightness_floor),
            events: EventFeedAdapter::new(),
            geocoder: Geocoder::new(http.clone(), &config.geocoder_url),
            caches: FeedCaches {
                thermal: QueryCache::new(policy),
                events: QueryCache::new(policy),
                incidents: QueryCache::new(policy),
                sensors: QueryCache::new(policy),
                reports: QueryCache::new(policy),
            },
            metrics: MetricsRecorder::new(),
            snapshot: Arc::new(RwLock::new(snapshot)),
            thermal_url,
            backend,
            http,
            config,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn backend(&self) -> Option<&BackendClient> {
        self.backend.as_ref()
    }

    pub fn shared_snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        read_snapshot(&self.snapshot)
    }

    pub fn metrics(&self) -> BTreeMap<String, FeedMetrics> {
        self.metrics.snapshot()
    }

    pub fn fire_locations(&self) -> Vec<ApproximateLocation> {
        let snapshot = self.snapshot();
        extract_fire_locations(&snapshot.events.data, &snapshot.detections.data)
    }

    /// Sources this runner can refresh; backend collections need a backend.
    pub fn sources(&self) -> Vec<FeedSource> {
        FeedSource::ALL
            .into_iter()
            .filter(|source| self.backend.is_some() || !is_backend_source(*source))
            .collect()
    }

    pub async fn refresh(&self, source: FeedSource) -> FeedResult<usize> {
        match source {
            FeedSource::ThermalDetections => self.refresh_thermal().await,
            FeedSource::SatelliteEvents => self.refresh_events().await,
            FeedSource::Incidents => self.refresh_incidents().await,
            FeedSource::Sensors => self.refresh_sensors().await,
            FeedSource::Reports => self.refresh_reports().await,
        }
    }

    pub async fn refresh_all(&self) -> Vec<(FeedSource, FeedResult<usize>)> {
        let mut outcomes = Vec::new();
        for source in self.sources() {
            outcomes.push((source, self.refresh(source).await));
        }
        outcomes
    }

    pub async fn refresh_thermal(&self) -> FeedResult<usize> {
        let result = match self.thermal_url.as_deref() {
            Some(url) => {
                self.caches
                    .thermal
                    .get_or_fetch(|| async {
                        let body = fetch_thermal_csv(&self.http, url).await?;
                        self.normalize(&self.thermal, &body)
                    })
                    .await
            }
            None => Err(FeedError::Transport("thermal feed has no map key".into())),
        };
        self.publish(FeedSource::ThermalDetections, |s| &mut s.detections, result)
    }

    pub async fn refresh_events(&self) -> FeedResult<usize> {
        let url = self.config.feeds.events_url.as_str();
        let result = self
            .caches
            .events
            .get_or_fetch(|| async {
                let body = fetch_events_json(&self.http, url).await?;
                self.normalize(&self.events, &body)
            })
            .await;
        self.publish(FeedSource::SatelliteEvents, |s| &mut s.events, result)
    }

    pub async fn refresh_incidents(&self) -> FeedResult<usize> {
        let query = RowQuery::new().order_by("created_at", Direction::Descending);
        let result = self
            .fetch_collection(FeedSource::Incidents, &self.caches.incidents, INCIDENTS_COLLECTION, &query)
            .await;
        self.publish(FeedSource::Incidents, |s| &mut s.incidents, result)
    }

    pub async fn refresh_sensors(&self) -> FeedResult<usize> {
        let query = RowQuery::new()
            .eq("is_active", true)
            .order_by("detection_time", Direction::Descending);
        let result = self
            .fetch_collection(FeedSource::Sensors, &self.caches.sensors, SENSORS_COLLECTION, &query)
            .await;
        self.publish(FeedSource::Sensors, |s| &mut s.sensors, result)
    }

    pub async fn refresh_reports(&self) -> FeedResult<usize> {
        let query = RowQuery::new().order_by("created_at", Direction::Descending);
        let result = self
            .fetch_collection(FeedSource::Reports, &self.caches.reports, REPORTS_COLLECTION, &query)
            .await;
        self.publish(FeedSource::Reports, |s| &mut s.reports, result)
    }

    /// Normalizes the given bodies and publishes them as the satellite slices.
    pub fn run_offline(&self, thermal_csv: &str, events_json: &str) -> anyhow::Result<OfflineSummary> {
        let detections = self
            .normalize_batch(&self.thermal, thermal_csv)
            .context("normalizing thermal feed")?;
        let events = self
            .normalize_batch(&self.events, events_json)
            .context("normalizing events feed")?;

        let summary = OfflineSummary {
            detections: detections.points.len(),
            events: events.points.len(),
            skipped: detections.metadata.skipped + events.metadata.skipped,
            fallback_applied: detections.metadata.fallback_applied,
            locations: extract_fire_locations(&events.points, &detections.points),
        };
        update_snapshot(&self.snapshot, |snapshot| {
            snapshot.detections.succeed(detections.points);
            snapshot.events.succeed(events.points);
        });
        Ok(summary)
    }

    /// Files a user report, then refreshes the reports slice so it shows at once.
    pub async fn submit_report(&self, submission: &ReportSubmission) -> Result<UserReport, ReportError> {
        let (Some(backend), Some(settings)) = (self.backend.as_ref(), self.config.backend.as_ref()) else {
            return Err(ReportError::InsertFailed("no backend configured".into()));
        };
        let sink = ReportSink {
            backend,
            geocoder: &self.geocoder,
            bucket: &settings.report_bucket,
        };
        let report = submit_report(&sink, submission).await?;

        self.caches.reports.invalidate().await;
        if let Err(err) = self.refresh_reports().await {
            LogManager::new(FeedSource::Reports).warn(&format!("refresh after insert failed: {err}"));
        }
        Ok(report)
    }

    /// Realtime sensor insert: active sensors are prepended unless already present.
    pub fn merge_sensor(&self, sensor: Sensor) -> bool {
        if !sensor.is_active {
            return false;
        }
        let mut merged = false;
        update_snapshot(&self.snapshot, |snapshot| {
            let sensors = &mut snapshot.sensors.data;
            if !sensors.iter().any(|existing| existing.id == sensor.id) {
                sensors.insert(0, sensor);
                merged = true;
            }
        });
        merged
    }

    async fn fetch_collection<T>(
        &self,
        source: FeedSource,
        cache: &QueryCache<Vec<T>>,
        collection: &str,
        query: &RowQuery,
    ) -> FeedResult<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Clone,
    {
        let Some(backend) = self.backend.as_ref() else {
            return Err(FeedError::Backend("no backend configured".into()));
        };
        cache
            .get_or_fetch(|| async {
                let batch: FeedBatch<T> = backend.fetch_rows(collection, query).await?;
                self.metrics
                    .record_batch(source, batch.points.len(), &batch.metadata);
                LogManager::new(source).record(&format!(
                    "fetched {} rows, skipped {}",
                    batch.points.len(),
                    batch.metadata.skipped
                ));
                Ok(batch.points)
            })
            .await
    }

    fn normalize<A>(&self, adapter: &A, body: &str) -> FeedResult<Vec<A::Output>>
    where
        A: FeedAdapter,
    {
        self.normalize_batch(adapter, body).map(|batch| batch.points)
    }

    fn normalize_batch<A>(&self, adapter: &A, body: &str) -> FeedResult<FeedBatch<A::Output>>
    where
        A: FeedAdapter,
    {
        let batch = adapter.normalize(body)?;
        self.metrics
            .record_batch(adapter.source(), batch.points.len(), &batch.metadata);
        Ok(batch)
    }

    fn publish<T, F>(&self, source: FeedSource, slice: F, result: FeedResult<Vec<T>>) -> FeedResult<usize>
    where
        F: FnOnce(&mut DashboardSnapshot) -> &mut SourceSnapshot<T>,
    {
        match result {
            Ok(data) => {
                let count = data.len();
                update_snapshot(&self.snapshot, |snapshot| slice(snapshot).succeed(data));
                Ok(count)
            }
            Err(err) => {
                self.metrics.record_error(source);
                LogManager::new(source).warn(&format!("refresh failed: {err}"));
                let message = err.to_string();
                update_snapshot(&self.snapshot, |snapshot| slice(snapshot).fail(message));
                Err(err)
            }
        }
    }
}

fn is_backend_source(source: FeedSource) -> bool {
    matches!(
        source,
        FeedSource::Incidents | FeedSource::Sensors | FeedSource::Reports
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::synthetic::{events_json, thermal_csv, SyntheticConfig};
    use crate::workflow::config::BackendConfig;
    use guardcore::model::FeedStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warp::Filter;

    const THERMAL: &str = "latitude,longitude,bright_ti4,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,frp\n\
        40.1,-120.5,350.2,0.4,0.4,2024-08-01,0130,N20,VIIRS,high,2.0NRT,25.3\n\
        41.0,-121.0,300.0,0.4,0.4,2024-08-01,0130,N20,VIIRS,low,2.0NRT,1.0\n";

    fn offline_runner() -> Runner {
        let mut config = DashboardConfig::default();
        config.feeds.map_key = Some("test".into());
        Runner::new(config).unwrap()
    }

    #[test]
    fn runner_without_backend_marks_collections_loaded() {
        let runner = offline_runner();
        let snapshot = runner.snapshot();
        assert_eq!(snapshot.incidents.status, FeedStatus::Ready);
        assert_eq!(snapshot.detections.status, FeedStatus::Pending);
        assert_eq!(
            runner.sources(),
            vec![FeedSource::SatelliteEvents, FeedSource::ThermalDetections]
        );
    }

    #[test]
    fn offline_run_publishes_satellite_slices() {
        let runner = offline_runner();
        let config = SyntheticConfig {
            seed: 5,
            ..Default::default()
        };
        let summary = runner
            .run_offline(&thermal_csv(&config), &events_json(&config))
            .unwrap();

        let snapshot = runner.snapshot();
        assert_eq!(snapshot.detections.data.len(), summary.detections);
        assert_eq!(snapshot.events.data.len(), summary.events);
        assert!(summary.locations.len() <= 10);
        assert!(runner.metrics()["thermal"].skipped > 0);
    }

    #[test]
    fn offline_run_rejects_broken_events_document() {
        let runner = offline_runner();
        assert!(runner.run_offline(THERMAL, "{\"nope\": []}").is_err());
    }

    #[tokio::test]
    async fn feed_refresh_is_cached_and_failures_keep_data() {
        let thermal_hits = Arc::new(AtomicUsize::new(0));
        let hits = thermal_hits.clone();
        let thermal = warp::path!("csv" / String).map(move |_key: String| {
            hits.fetch_add(1, Ordering::SeqCst);
            THERMAL
        });
        let events = warp::path("events").map(|| {
            warp::reply::with_status("upstream down", warp::http::StatusCode::SERVICE_UNAVAILABLE)
        });
        let (addr, server) = warp::serve(thermal.or(events)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let mut config = DashboardConfig::default();
        config.feeds.thermal_url = format!("http://{addr}/csv/{{map_key}}");
        config.feeds.map_key = Some("k".into());
        config.feeds.events_url = format!("http://{addr}/events");
        let runner = Runner::new(config).unwrap();

        assert_eq!(runner.refresh_thermal().await.unwrap(), 1);
        assert_eq!(runner.refresh_thermal().await.unwrap(), 1);
        assert_eq!(thermal_hits.load(Ordering::SeqCst), 1);

        let err = runner.refresh_events().await.unwrap_err();
        assert!(matches!(err, FeedError::Status { status: 503, .. }));
        let snapshot = runner.snapshot();
        assert_eq!(snapshot.detections.data[0].frp, 25.3);
        assert!(matches!(snapshot.events.status, FeedStatus::Failed(_)));
        assert_eq!(runner.metrics()["events"].errors, 1);
    }

    #[tokio::test]
    async fn backend_collections_and_realtime_merge() {
        let incidents = warp::path!("rest" / "v1" / "fire_incidents").map(|| {
            warp::reply::json(&json!([{
                "id": "inc-1", "name": "Park Fire", "location": "Butte County, CA",
                "latitude": 39.8, "longitude": -121.7, "severity": "critical", "status": "active",
                "start_date": "2024-07-24T00:00:00Z", "last_updated": "2024-07-30T00:00:00Z"
            }, {
                "id": "inc-2", "name": "Odd Fire", "location": "Unknown",
                "latitude": 39.0, "longitude": -121.0, "severity": "extreme", "status": "active",
                "start_date": "2024-07-24T00:00:00Z", "last_updated": "2024-07-30T00:00:00Z"
            }]))
        });
        let (addr, server) = warp::serve(incidents).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let mut config = DashboardConfig::default();
        config.backend = Some(BackendConfig {
            url: format!("http://{addr}"),
            api_key: None,
            report_bucket: "fire-reports".into(),
            realtime_poll_secs: 10,
        });
        let runner = Runner::new(config).unwrap();

        assert_eq!(runner.refresh_incidents().await.unwrap(), 1);
        assert!(runner.refresh_sensors().await.is_err());

        let sensor: Sensor = serde_json::from_value(json!({
            "id": "s9", "sensor_type": "aerial", "name": "drone", "latitude": 39.0,
            "longitude": -121.0, "detection_time": "2024-07-30T00:00:00Z", "is_active": true
        }))
        .unwrap();
        assert!(runner.merge_sensor(sensor.clone()));
        assert!(!runner.merge_sensor(sensor));

        let snapshot = runner.snapshot();
        assert_eq!(snapshot.incidents.data.len(), 1);
        assert_eq!(snapshot.incidents.data[0].name, "Park Fire");
        assert_eq!(runner.metrics()["incidents"].skipped, 1);
        assert_eq!(snapshot.sensors.data.len(), 1);
    }

    #[tokio::test]
    async fn report_without_backend_is_rejected() {
        let runner = offline_runner();
        let err = runner
            .submit_report(&ReportSubmission::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::InsertFailed(_)));
    }
}
