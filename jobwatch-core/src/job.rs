use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::status::JobStatus;
use crate::value::ConfigValue;

/// A key/value entry surfaced in document order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry<V> {
    pub key: String,
    pub value: V,
}

/// Where and how the job's code was set up on the worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Environment {
    pub script: String,
    pub clone: Option<CloneConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloneConfiguration {
    pub path: String,
}

/// A job record as read from the metadata store.
///
/// `status` is the *stored* status; the UNRESPONSIVE derivation happens at
/// the presentation boundary and is never written back.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub user: String,
    pub project: String,
    pub experiment: String,
    // The job name. The field is called `job` end to end, matching the
    // store document and the query parameter that filters on it.
    pub job: String,
    pub status: JobStatus,
    pub host: String,
    pub output_directory: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_heartbeat_time: Option<DateTime<Utc>>,
    pub config: Vec<Entry<ConfigValue>>,
    pub annotations: Vec<Entry<String>>,
    pub exception: Option<String>,
    pub environment: Environment,
    pub progress: Option<f64>,
}

/// Request-scoped listing criteria. Absent fields contribute no constraint.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub ids: Option<Vec<String>>,
    pub user: Option<String>,
    pub project: Option<String>,
    pub experiment: Option<String>,
    pub host: Option<String>,
    // Anchored whole-string regular expression matched against the job name.
    pub job: Option<String>,
    pub status: Option<JobStatus>,
    // None or 0 means unbounded.
    pub limit: Option<u64>,
}

impl JobFilter {
    pub fn by_id(id: &str) -> Self {
        JobFilter {
            ids: Some(vec![id.to_string()]),
            ..Default::default()
        }
    }
}
