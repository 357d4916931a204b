use crate::gui_bridge::model::{read_snapshot, ErrorBody, SharedSnapshot};
use crate::workflow::runner::Runner;
use anyhow::Context;
use guardcore::model::ReportSubmission;
use log::{info, warn};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::{http::StatusCode, Filter, Rejection, Reply};

/// Largest accepted report body, photo included.
const MAX_REPORT_BYTES: u64 = 16 * 1024 * 1024;

/// HTTP face of the aggregator, read by the dashboard.
pub struct GuiBridge {
    runner: Arc<Runner>,
}

impl GuiBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self { runner }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone + Send + Sync + 'static {
        let snapshot = self.runner.shared_snapshot();
        let snapshot_filter = warp::any().map(move || snapshot.clone());
        let runner = self.runner.clone();
        let runner_filter = warp::any().map(move || runner.clone());

        let snapshot_route = warp::path("snapshot")
            .and(warp::path::end())
            .and(warp::get())
            .and(snapshot_filter)
            .map(|shared: SharedSnapshot| warp::reply::json(&read_snapshot(&shared)));

        let locations_route = warp::path("locations")
            .and(warp::path::end())
            .and(warp::get())
            .and(runner_filter.clone())
            .map(|runner: Arc<Runner>| warp::reply::json(&runner.fire_locations()));

        let metrics_route = warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .and(runner_filter.clone())
            .map(|runner: Arc<Runner>| warp::reply::json(&runner.metrics()));

        let report_route = warp::path("reports")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_REPORT_BYTES))
            .and(warp::body::json())
            .and(runner_filter)
            .then(|submission: ReportSubmission, runner: Arc<Runner>| async move {
                match runner.submit_report(&submission).await {
                    Ok(report) => {
                        info!("[reports] accepted report {}", report.id);
                        warp::reply::with_status(warp::reply::json(&report), StatusCode::OK)
                    }
                    Err(err) => {
                        warn!("[reports] rejected: {err}");
                        warp::reply::with_status(
                            warp::reply::json(&ErrorBody {
                                error: err.to_string(),
                            }),
                            StatusCode::UNPROCESSABLE_ENTITY,
                        )
                    }
                }
            });

        snapshot_route
            .or(locations_route)
            .or(metrics_route)
            .or(report_route)
    }

    /// Serves until `shutdown` resolves.
    pub async fn serve_until<S>(&self, addr: SocketAddr, shutdown: S) -> anyhow::Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .with_context(|| format!("binding dashboard bridge on {addr}"))?;
        info!("dashboard bridge listening on http://{bound}");
        server.await;
        Ok(())
    }

    /// Binds an OS-assigned port on localhost and serves in the background.
    #[cfg(test)]
    pub fn bind_ephemeral(&self) -> SocketAddr {
        let (addr, server) = warp::serve(self.routes()).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }
}
