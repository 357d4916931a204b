use crate::workflow::runner::{Runner, SENSORS_COLLECTION};
use crate::sources::RowQuery;
use guardcore::model::Sensor;
use guardcore::prelude::FeedSource;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Starts one refresh loop per source plus the realtime sensor listener.
///
/// Sources never wait on each other; a hung feed only delays its own loop.
pub fn spawn_refresh_tasks(runner: Arc<Runner>) -> Vec<JoinHandle<()>> {
    let period = runner.config().refresh_policy().refetch_interval;
    let mut handles: Vec<JoinHandle<()>> = runner
        .sources()
        .into_iter()
        .map(|source| spawn_refresh_loop(runner.clone(), source, period))
        .collect();

    if let Some(handle) = spawn_sensor_listener(runner) {
        handles.push(handle);
    }
    handles
}

fn spawn_refresh_loop(runner: Arc<Runner>, source: FeedSource, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match runner.refresh(source).await {
                Ok(count) => info!("[{source}] refreshed, {count} items"),
                Err(err) => warn!("[{source}] refresh failed, keeping last data: {err}"),
            }
        }
    })
}

fn spawn_sensor_listener(runner: Arc<Runner>) -> Option<JoinHandle<()>> {
    let backend = runner.backend()?.clone();
    let poll = Duration::from_secs(
        runner
            .config()
            .backend
            .as_ref()
            .map_or(10, |settings| settings.realtime_poll_secs)
            .max(1),
    );
    let mut inserts = backend.subscribe_inserts::<Sensor>(
        SENSORS_COLLECTION,
        RowQuery::new().eq("is_active", true),
        poll,
    );

    Some(tokio::spawn(async move {
        while let Some(sensor) = inserts.recv().await {
            let id = sensor.id.clone();
            if runner.merge_sensor(sensor) {
                info!("[sensors] realtime insert {id}");
            }
        }
    }))
}
