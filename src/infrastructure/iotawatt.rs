// IotaWatt query API client
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::application::monitor_client::{FetchError, MonitorClient};
use crate::domain::reading::{PowerPoint, ReadingSet, Source};

/// Polls an IotaWatt device. Two requests per poll: one to enumerate the
/// watt-reporting series, one to fetch the rolling window for all of them.
/// Both are bounded by the client-wide timeout; any failure discards the
/// whole attempt.
#[derive(Debug, Clone)]
pub struct IotaWattClient {
    base: String,
    history_hours: u32,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SeriesListResponse {
    series: Vec<SeriesEntry>,
}

#[derive(Debug, Deserialize)]
struct SeriesEntry {
    name: String,
    unit: String,
}

/// `/query` response with `header=yes`: column labels, then rows of
/// `[epoch, v0, v1, ...]` where missing samples come back as null.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    labels: Vec<String>,
    data: Vec<Vec<Option<f64>>>,
}

impl IotaWattClient {
    pub fn new(
        endpoint: &str,
        fetch_timeout: Duration,
        history_hours: u32,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self {
            base: endpoint.trim_end_matches('/').to_string(),
            history_hours,
            client,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }

    /// Names of the series reporting watts, in the device's order.
    async fn watt_series(&self) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/query?show=series", self.base);
        tracing::debug!(%url, "listing monitor series");
        let listing: SeriesListResponse = self.get_json(&url).await?;
        Ok(listing
            .series
            .into_iter()
            .filter(|s| s.unit == "Watts")
            .map(|s| s.name)
            .collect())
    }

    fn history_url(&self, names: &[String]) -> String {
        let columns: Vec<String> = names.iter().map(|n| format!("{n}.Watts.d1")).collect();
        let select = format!("[time.utc.unix,{}]", columns.join(","));
        format!(
            "{}/query?select={}&begin=s-{}h&end=s&group=auto&format=json&resolution=high&header=yes",
            self.base,
            urlencoding::encode(&select),
            self.history_hours,
        )
    }
}

#[async_trait]
impl MonitorClient for IotaWattClient {
    async fn fetch(&self) -> Result<ReadingSet, FetchError> {
        let fetched_at = Utc::now();

        let names = self.watt_series().await?;
        if names.is_empty() {
            tracing::debug!("monitor reports no watt series");
            return Ok(ReadingSet::new(Vec::new(), fetched_at));
        }

        let url = self.history_url(&names);
        tracing::debug!(%url, "querying monitor history");
        let response: QueryResponse = self.get_json(&url).await?;

        let sources = convert_query_response(response, &names)?;
        tracing::debug!(sources = sources.len(), "poll complete");
        Ok(ReadingSet::new(sources, fetched_at))
    }
}

/// Turns the tabular query response into per-source readings. Rejects the
/// whole response on any structural inconsistency; a half-parsed table would
/// put a misleading screen on the wall.
fn convert_query_response(
    response: QueryResponse,
    requested: &[String],
) -> Result<Vec<Source>, FetchError> {
    match response.labels.first().map(String::as_str) {
        Some("Time") => {}
        _ => {
            return Err(FetchError::Malformed(
                "first column of query response is not Time".into(),
            ));
        }
    }
    if response.labels.len() != requested.len() + 1 {
        return Err(FetchError::Malformed(format!(
            "expected {} columns, got {}",
            requested.len() + 1,
            response.labels.len()
        )));
    }
    for row in &response.data {
        if row.len() != response.labels.len() {
            return Err(FetchError::Malformed(
                "query rows are not of uniform width".into(),
            ));
        }
    }

    let mut sources = Vec::with_capacity(requested.len());
    for (column, label) in response.labels.iter().enumerate().skip(1) {
        let mut history = Vec::new();
        for row in &response.data {
            // Null cells are gaps in the device's log; skip the sample.
            let (Some(epoch), Some(watts)) = (row[0], row[column]) else {
                continue;
            };
            history.push(PowerPoint::new(epoch as i64, watts));
        }
        let watts = history.last().map_or(0.0, |p| p.watts);
        sources.push(Source::new(label.clone(), label.clone(), watts, history));
    }
    Ok(sources)
}
