use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, TimeseriesError};

/// Connection settings for the time-series store HTTP API.
#[derive(Debug, Clone)]
pub struct TimeseriesConfig {
    /// Base URL, e.g. http://localhost:8086
    pub base_url: String,
    pub database: String,
    pub timeout_ms: u64,
}

/// Thin client for the time-series store `/query` endpoint.
///
/// Queries are submitted as request parameters, never spliced into the URL
/// by hand, and timestamps are requested in the store's native nanosecond
/// epoch so row extraction owns the millisecond conversion.
#[derive(Debug, Clone)]
pub struct TimeseriesClient {
    http: reqwest::Client,
    base_url: String,
    database: String,
}

impl TimeseriesClient {
    pub fn new(config: TimeseriesConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(TimeseriesClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            database: config.database,
        })
    }

    /// Run a single-statement query and return its result groups.
    ///
    /// A statement with no matching series yields an empty vector, never an
    /// error.
    pub async fn query(&self, statement: &str) -> Result<Vec<ResultGroup>> {
        let url = format!("{}/query", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("db", self.database.as_str()),
                ("q", statement),
                ("epoch", "ns"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: QueryResponse = response.json().await.map_err(|e| {
            TimeseriesError::QueryError(format!("unreadable response ({}): {}", status, e))
        })?;

        if let Some(error) = body.error {
            return Err(TimeseriesError::QueryError(error));
        }
        let first = body.results.into_iter().next().unwrap_or_default();
        if let Some(error) = first.error {
            return Err(TimeseriesError::QueryError(error));
        }

        Ok(first.series.unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Option<Vec<ResultGroup>>,
    #[serde(default)]
    error: Option<String>,
}

/// One grouped result set: rows keyed by a tag set, with column-ordered
/// value vectors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}
