use guardcore::prelude::{FeedError, FeedResult};
use log::debug;

/// Raw thermal detection CSV.
pub async fn fetch_thermal_csv(http: &reqwest::Client, url: &str) -> FeedResult<String> {
    fetch_body(http, url).await
}

/// Raw open-events JSON document.
pub async fn fetch_events_json(http: &reqwest::Client, url: &str) -> FeedResult<String> {
    fetch_body(http, url).await
}

async fn fetch_body(http: &reqwest::Client, url: &str) -> FeedResult<String> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|err| FeedError::Transport(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status {
            status: status.as_u16(),
            url: redact(url),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|err| FeedError::Transport(err.to_string()))?;
    debug!("fetched {} bytes from {}", body.len(), redact(url));
    Ok(body)
}

/// Drops the path segments after `/csv/` so map keys never reach logs or notices.
pub(crate) fn redact(url: &str) -> String {
    match url.split_once("/csv/") {
        Some((head, _)) => format!("{head}/csv/..."),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::Filter;

    #[test]
    fn redact_hides_map_key() {
        assert_eq!(
            redact("https://firms.example/api/area/csv/SECRET/VIIRS/world/3"),
            "https://firms.example/api/area/csv/..."
        );
        assert_eq!(redact("https://eonet.example/events"), "https://eonet.example/events");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let routes = warp::path("events")
            .map(|| warp::reply::with_status("down", warp::http::StatusCode::BAD_GATEWAY))
            .or(warp::path("csv").map(|| "latitude,longitude\n"));
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let http = reqwest::Client::new();
        let err = fetch_events_json(&http, &format!("http://{addr}/events"))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Status { status: 502, .. }));

        let body = fetch_thermal_csv(&http, &format!("http://{addr}/csv"))
            .await
            .unwrap();
        assert_eq!(body, "latitude,longitude\n");
    }
}
