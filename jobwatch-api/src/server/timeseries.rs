use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use jobwatch_core::FieldValue;
use jobwatch_timeseries_store::{
    aggregate_rows, parse_series, raw_rows, series_keys, AggregateOp, ResultGroup,
    SeriesDescriptor, SeriesQuery, TimeseriesError,
};

use super::app::AppState;
use super::errors::ApiError;

type FieldRow = HashMap<String, FieldValue>;

#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryParams {
    /// Pattern match on the measurement name
    pub measurement: Option<String>,
    /// Tag equality clauses, key=value,key2=value2
    pub tags: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagParams {
    pub tags: Option<String>,
}

#[derive(Serialize)]
pub struct SeriesListResponse {
    pub series: Vec<SeriesDescriptor>,
}

/// One series with every nested field resolved. Sibling fields that failed
/// resolve to their empty forms and report into `errors`.
#[derive(Serialize)]
pub struct SeriesPageResponse {
    pub measurement: String,
    pub job_id: String,
    pub values: Vec<FieldRow>,
    pub current_value: FieldRow,
    pub max_value: FieldRow,
    pub min_value: FieldRow,
    pub errors: Vec<String>,
}

fn scoped_query(
    job_id: &str,
    measurement: Option<&str>,
    tags: Option<&str>,
) -> Result<SeriesQuery, ApiError> {
    let mut query = SeriesQuery::for_job(job_id);
    if let Some(measurement) = measurement {
        query = query.with_measurement(measurement);
    }
    if let Some(tags) = tags {
        query = query.with_tag_filter(tags)?;
    }
    Ok(query)
}

pub async fn list_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<DiscoveryParams>,
) -> Result<Json<SeriesListResponse>, ApiError> {
    let query = scoped_query(&id, params.measurement.as_deref(), params.tags.as_deref())?;

    let groups = state.timeseries.query(&query.discovery()).await?;
    let series = series_keys(&groups)
        .iter()
        .map(|key| parse_series(key, &id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(SeriesListResponse { series }))
}

pub async fn series_values(
    State(state): State<Arc<AppState>>,
    Path((id, measurement)): Path<(String, String)>,
    Query(params): Query<TagParams>,
) -> Result<Json<Vec<FieldRow>>, ApiError> {
    let query = scoped_query(&id, Some(&measurement), params.tags.as_deref())?;
    let groups = state.timeseries.query(&query.raw_values()?).await?;
    Ok(Json(raw_rows(&groups)))
}

pub async fn series_current(
    state: State<Arc<AppState>>,
    path: Path<(String, String)>,
    params: Query<TagParams>,
) -> Result<Json<FieldRow>, ApiError> {
    scalar_aggregate(state, path, params, AggregateOp::Last).await
}

pub async fn series_max(
    state: State<Arc<AppState>>,
    path: Path<(String, String)>,
    params: Query<TagParams>,
) -> Result<Json<FieldRow>, ApiError> {
    scalar_aggregate(state, path, params, AggregateOp::Max).await
}

pub async fn series_min(
    state: State<Arc<AppState>>,
    path: Path<(String, String)>,
    params: Query<TagParams>,
) -> Result<Json<FieldRow>, ApiError> {
    scalar_aggregate(state, path, params, AggregateOp::Min).await
}

async fn scalar_aggregate(
    State(state): State<Arc<AppState>>,
    Path((id, measurement)): Path<(String, String)>,
    Query(params): Query<TagParams>,
    op: AggregateOp,
) -> Result<Json<FieldRow>, ApiError> {
    let query = scoped_query(&id, Some(&measurement), params.tags.as_deref())?;
    let groups = state.timeseries.query(&query.aggregate(op)?).await?;
    let row = aggregate_rows(&groups, op)
        .into_iter()
        .next()
        .unwrap_or_default();
    Ok(Json(row))
}

/// Resolve a series' raw values and its three scalar aggregates as sibling
/// fields. The queries run concurrently and fail independently: one failed
/// field becomes an entry in `errors` while the others keep their results.
pub async fn series_page(
    State(state): State<Arc<AppState>>,
    Path((id, measurement)): Path<(String, String)>,
    Query(params): Query<TagParams>,
) -> Result<Json<SeriesPageResponse>, ApiError> {
    // Malformed input fails the whole request before any store call.
    let query = scoped_query(&id, Some(&measurement), params.tags.as_deref())?;
    let values_query = query.raw_values()?;
    let last_query = query.aggregate(AggregateOp::Last)?;
    let max_query = query.aggregate(AggregateOp::Max)?;
    let min_query = query.aggregate(AggregateOp::Min)?;

    let (values_result, last_result, max_result, min_result) = tokio::join!(
        state.timeseries.query(&values_query),
        state.timeseries.query(&last_query),
        state.timeseries.query(&max_query),
        state.timeseries.query(&min_query),
    );

    let mut errors: Vec<String> = Vec::new();

    let values = match values_result {
        Ok(groups) => raw_rows(&groups),
        Err(e) => {
            errors.push(format!("values {}", e));
            Vec::new()
        }
    };

    let mut scalar = |result: Result<Vec<ResultGroup>, TimeseriesError>, op: AggregateOp, name: &str| match result {
        Ok(groups) => aggregate_rows(&groups, op)
            .into_iter()
            .next()
            .unwrap_or_default(),
        Err(e) => {
            errors.push(format!("{} {}", name, e));
            FieldRow::default()
        }
    };

    let current_value = scalar(last_result, AggregateOp::Last, "current_value");
    let max_value = scalar(max_result, AggregateOp::Max, "max_value");
    let min_value = scalar(min_result, AggregateOp::Min, "min_value");

    Ok(Json(SeriesPageResponse {
        measurement,
        job_id: id,
        values,
        current_value,
        max_value,
        min_value,
        errors,
    }))
}
