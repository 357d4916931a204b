//! Crowd-sourced fire report submission.

use crate::sources::{BackendClient, Geocoder};
use chrono::Utc;
use guardcore::model::{NewReport, ReportStatus, ReportSubmission, UserReport};
use guardcore::prelude::Coordinate;
use log::{info, warn};

pub const REPORTS_COLLECTION: &str = "fire_reports";

/// Failures shown to the reporter. The submission is never consumed, so it can be retried as-is.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    #[error("Could not locate this address. Try shortening it (street + city) or use your current location.")]
    AddressNotFound,
    #[error("Please enable location access or enter an address to report a fire.")]
    LocationRequired,
    #[error("Failed to upload image. Please try again.")]
    UploadFailed(String),
    #[error("Failed to submit report: {0}")]
    InsertFailed(String),
    #[error("Address search is unavailable: {0}")]
    Transport(String),
}

/// Where reports go: the backend collection and the bucket for photos.
pub struct ReportSink<'a> {
    pub backend: &'a BackendClient,
    pub geocoder: &'a Geocoder,
    pub bucket: &'a str,
}

pub async fn submit_report(
    sink: &ReportSink<'_>,
    submission: &ReportSubmission,
) -> Result<UserReport, ReportError> {
    let location = resolve_location(sink.geocoder, submission).await?;

    let photo_urls = match &submission.photo {
        Some(photo) => {
            let path = format!(
                "{}.{}",
                Utc::now().timestamp_millis(),
                photo.extension().unwrap_or("bin")
            );
            let url = sink
                .backend
                .upload(sink.bucket, &path, photo.bytes.clone(), &photo.content_type)
                .await
                .map_err(|err| {
                    warn!("photo upload to {} failed: {err}", sink.bucket);
                    ReportError::UploadFailed(err.to_string())
                })?;
            Some(vec![url])
        }
        None => None,
    };

    let row = NewReport {
        latitude: location.lat,
        longitude: location.lon,
        description: submission.description.clone(),
        has_visible_smoke: submission.has_visible_smoke,
        has_visible_flames: submission.has_visible_flames,
        has_smell: submission.has_smell,
        photo_urls,
        report_status: ReportStatus::Pending,
    };

    let inserted: UserReport = sink
        .backend
        .insert_row(REPORTS_COLLECTION, &row)
        .await
        .map_err(|err| {
            warn!("report insert failed: {err}");
            ReportError::InsertFailed(err.to_string())
        })?;
    info!(
        "report {} stored at {:.4}, {:.4}",
        inserted.id, inserted.latitude, inserted.longitude
    );
    Ok(inserted)
}

async fn resolve_location(
    geocoder: &Geocoder,
    submission: &ReportSubmission,
) -> Result<Coordinate, ReportError> {
    if let Some(address) = submission.address() {
        return geocoder
            .resolve(address)
            .await
            .map_err(|err| ReportError::Transport(err.to_string()))?
            .ok_or(ReportError::AddressNotFound);
    }

    submission
        .device_location
        .filter(Coordinate::is_finite)
        .ok_or(ReportError::LocationRequired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardcore::model::PhotoUpload;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use warp::Filter;

    #[derive(Default)]
    struct Seen {
        inserts: Vec<Value>,
        uploads: Vec<String>,
    }

    /// Address search, storage and record store on one ephemeral server.
    fn mock_backend(fail_upload: bool) -> (String, Arc<Mutex<Seen>>) {
        let seen = Arc::new(Mutex::new(Seen::default()));

        let search = warp::path("search").map(|| {
            warp::reply::json(&json!([{"lat": "45.52", "lon": "-122.68"}]))
        });

        let seen_uploads = seen.clone();
        let upload = warp::path!("storage" / "v1" / "object" / String / String)
            .and(warp::post())
            .map(move |bucket: String, name: String| {
                seen_uploads.lock().unwrap().uploads.push(format!("{bucket}/{name}"));
                let status = if fail_upload {
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    warp::http::StatusCode::OK
                };
                warp::reply::with_status(warp::reply::json(&json!({"Key": name})), status)
            });

        let seen_inserts = seen.clone();
        let insert = warp::path!("rest" / "v1" / "fire_reports")
            .and(warp::post())
            .and(warp::body::json())
            .map(move |mut row: Value| {
                seen_inserts.lock().unwrap().inserts.push(row.clone());
                row["id"] = json!("r-1");
                row["created_at"] = json!("2024-08-01T17:05:00Z");
                warp::reply::json(&json!([row]))
            });

        let (addr, server) =
            warp::serve(search.or(upload).or(insert)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        (format!("http://{addr}"), seen)
    }

    fn clients(base: &str) -> (BackendClient, Geocoder) {
        let http = reqwest::Client::new();
        (
            BackendClient::new(http.clone(), base, None),
            Geocoder::new(http, &format!("{base}/search")),
        )
    }

    #[tokio::test]
    async fn address_report_with_photo_is_stored_pending() {
        let (base, seen) = mock_backend(false);
        let (backend, geocoder) = clients(&base);
        let sink = ReportSink {
            backend: &backend,
            geocoder: &geocoder,
            bucket: "fire-reports",
        };
        let submission = ReportSubmission {
            description: "Flames behind the school".into(),
            has_visible_flames: true,
            address: Some("  1 School Rd, Portland  ".into()),
            photo: Some(PhotoUpload {
                file_name: "ridge.jpg".into(),
                content_type: "image/jpeg".into(),
                bytes: vec![0xff, 0xd8, 0xff],
            }),
            ..Default::default()
        };

        let report = submit_report(&sink, &submission).await.unwrap();

        assert_eq!(report.id, "r-1");
        assert_eq!(report.report_status, ReportStatus::Pending);
        assert_eq!((report.latitude, report.longitude), (45.52, -122.68));
        let seen = seen.lock().unwrap();
        assert!(seen.uploads[0].starts_with("fire-reports/"));
        assert!(seen.uploads[0].ends_with(".jpg"));
        let urls = seen.inserts[0]["photo_urls"].as_array().unwrap();
        assert!(urls[0]
            .as_str()
            .unwrap()
            .contains("/storage/v1/object/public/fire-reports/"));
        assert_eq!(seen.inserts[0]["report_status"], json!("pending"));
    }

    #[tokio::test]
    async fn device_location_is_used_without_address() {
        let (base, seen) = mock_backend(false);
        let (backend, geocoder) = clients(&base);
        let sink = ReportSink {
            backend: &backend,
            geocoder: &geocoder,
            bucket: "fire-reports",
        };
        let submission = ReportSubmission {
            address: Some("   ".into()),
            device_location: Some(Coordinate::new(38.5, -121.5)),
            ..Default::default()
        };

        let report = submit_report(&sink, &submission).await.unwrap();
        assert_eq!(report.coordinate(), Coordinate::new(38.5, -121.5));
        assert_eq!(seen.lock().unwrap().inserts[0]["photo_urls"], Value::Null);
    }

    #[tokio::test]
    async fn missing_location_and_failed_upload_are_reported() {
        let (base, seen) = mock_backend(true);
        let (backend, geocoder) = clients(&base);
        let sink = ReportSink {
            backend: &backend,
            geocoder: &geocoder,
            bucket: "fire-reports",
        };

        let err = submit_report(&sink, &ReportSubmission::default())
            .await
            .unwrap_err();
        assert_eq!(err, ReportError::LocationRequired);

        let with_photo = ReportSubmission {
            device_location: Some(Coordinate::new(38.5, -121.5)),
            photo: Some(PhotoUpload {
                file_name: "smoke.png".into(),
                content_type: "image/png".into(),
                bytes: vec![1, 2, 3],
            }),
            ..Default::default()
        };
        let err = submit_report(&sink, &with_photo).await.unwrap_err();
        assert!(matches!(err, ReportError::UploadFailed(_)));
        assert_eq!(err.to_string(), "Failed to upload image. Please try again.");
        assert!(seen.lock().unwrap().inserts.is_empty());
    }
}
