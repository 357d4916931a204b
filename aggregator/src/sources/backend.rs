//! REST client for the managed record store and file storage.
//!
//! Collections are exposed as `/rest/v1/<collection>` with PostgREST-style
//! query parameters; objects live under `/storage/v1/object/<bucket>/<path>`.

use guardcore::model::Sensor;
use guardcore::prelude::{BatchMetadata, FeedBatch, FeedError, FeedResult};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering and equality filters for a collection read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    order: Option<(String, Direction)>,
    filters: Vec<(String, String)>,
}

impl RowQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        if let Some((column, direction)) = &self.order {
            let suffix = match direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            params.push(("order".to_string(), format!("{column}.{suffix}")));
        }
        for (column, value) in &self.filters {
            params.push((column.clone(), format!("eq.{value}")));
        }
        params
    }
}

/// Rows with a stable primary key, used to spot inserts while polling.
pub trait RowId {
    fn row_id(&self) -> &str;
}

impl RowId for Sensor {
    fn row_id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BackendClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    /// Reads a collection. Rows that do not decode are skipped and counted.
    pub async fn fetch_rows<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &RowQuery,
    ) -> FeedResult<FeedBatch<T>> {
        let url = format!("{}/rest/v1/{collection}", self.base_url);
        let response = self
            .authorize(self.http.get(&url).query(&query.to_params()))
            .send()
            .await
            .map_err(|err| FeedError::Transport(err.to_string()))?;
        let response = check_status(response, &url)?;
        let rows = response
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|err| FeedError::Decode(format!("{collection}: {err}")))?;
        Ok(decode_rows(collection, rows))
    }

    /// Inserts one row and returns it as stored.
    pub async fn insert_row<B, T>(&self, collection: &str, row: &B) -> FeedResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/rest/v1/{collection}", self.base_url);
        let response = self
            .authorize(self.http.post(&url))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await
            .map_err(|err| FeedError::Transport(err.to_string()))?;
        let response = check_status(response, &url)?;
        let mut rows = response
            .json::<Vec<T>>()
            .await
            .map_err(|err| FeedError::Decode(format!("{collection}: {err}")))?;
        if rows.is_empty() {
            return Err(FeedError::Backend(format!(
                "insert into {collection} returned no rows"
            )));
        }
        Ok(rows.swap_remove(0))
    }

    /// Stores `bytes` at `bucket/path` and returns the object's public URL.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> FeedResult<String> {
        let url = format!("{}/storage/v1/object/{bucket}/{path}", self.base_url);
        let response = self
            .authorize(self.http.post(&url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|err| FeedError::Transport(err.to_string()))?;
        check_status(response, &url)?;
        Ok(self.public_url(bucket, path))
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }

    /// Delivers rows inserted into `collection` after the call.
    ///
    /// The backend is polled every `poll` for ids not seen before. The task
    /// stops once the receiver is dropped.
    pub fn subscribe_inserts<T>(
        &self,
        collection: &str,
        query: RowQuery,
        poll: Duration,
    ) -> mpsc::Receiver<T>
    where
        T: DeserializeOwned + RowId + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(64);
        let client = self.clone();
        let collection = collection.to_string();

        tokio::spawn(async move {
            let mut seen: Option<HashSet<String>> = None;
            let mut ticker = tokio::time::interval(poll);
            loop {
                ticker.tick().await;
                let rows: Vec<T> = match client.fetch_rows(&collection, &query).await {
                    Ok(batch) => batch.points,
                    Err(err) => {
                        warn!("[{collection}] realtime poll failed: {err}");
                        continue;
                    }
                };

                let Some(known) = seen.as_mut() else {
                    seen = Some(rows.iter().map(|row| row.row_id().to_string()).collect());
                    continue;
                };

                // Oldest first so the receiver can prepend in arrival order.
                let fresh: Vec<T> = rows
                    .into_iter()
                    .filter(|row| known.insert(row.row_id().to_string()))
                    .collect();
                for row in fresh.into_iter().rev() {
                    debug!("[{collection}] insert {}", row.row_id());
                    if tx.send(row).await.is_err() {
                        return;
                    }
                }
            }
        });

        rx
    }
}

fn decode_rows<T: DeserializeOwned>(collection: &str, rows: Vec<serde_json::Value>) -> FeedBatch<T> {
    let mut metadata = BatchMetadata::default();
    let points: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(point) => Some(point),
            Err(err) => {
                metadata.skipped += 1;
                metadata.notes.push(err.to_string());
                None
            }
        })
        .collect();
    if metadata.skipped > 0 {
        warn!(
            "[{collection}] skipped {} malformed rows: {}",
            metadata.skipped,
            metadata.notes.join("; ")
        );
    }
    FeedBatch { points, metadata }
}

fn check_status(response: reqwest::Response, url: &str) -> FeedResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FeedError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
