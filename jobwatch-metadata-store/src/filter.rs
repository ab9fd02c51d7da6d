use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, Document};

use jobwatch_core::{stale_cutoff, JobFilter, JobStatus};

use crate::errors::{MetadataError, Result};

/// Upper bound on a job-name pattern. Patterns are forwarded to the store as
/// regular expressions, so unbounded input is rejected up front.
pub const MAX_NAME_PATTERN_BYTES: usize = 1024;

pub(crate) fn parse_object_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id)
        .map_err(|_| MetadataError::InvalidArguments(format!("not a valid job id: {}", id)))
}

pub(crate) fn validate_name_pattern(pattern: &str) -> Result<()> {
    if pattern.len() > MAX_NAME_PATTERN_BYTES {
        return Err(MetadataError::InvalidArguments(format!(
            "job name pattern exceeds {} bytes",
            MAX_NAME_PATTERN_BYTES
        )));
    }
    Ok(())
}

/// Anchor a job-name pattern so it must match the whole name.
pub(crate) fn anchored(pattern: &str) -> String {
    format!("^{}$", pattern)
}

/// Translate listing criteria into a store query document.
///
/// All active predicates are combined by conjunction. A RUNNING or
/// UNRESPONSIVE status becomes the compound stored-status + heartbeat-cutoff
/// predicate; the cutoff is derived from `now` with the same arithmetic the
/// classifier uses, so a filtered record can never reclassify the other way.
pub(crate) fn build_query(
    filter: &JobFilter,
    now: DateTime<Utc>,
    heartbeat_interval_secs: u64,
) -> Result<Document> {
    let mut query = Document::new();

    if let Some(ids) = &filter.ids {
        let object_ids = ids
            .iter()
            .map(|id| parse_object_id(id))
            .collect::<Result<Vec<_>>>()?;
        query.insert("_id", doc! { "$in": object_ids });
    }

    if let Some(user) = &filter.user {
        query.insert("user", user.as_str());
    }
    if let Some(project) = &filter.project {
        query.insert("project", project.as_str());
    }
    if let Some(experiment) = &filter.experiment {
        query.insert("experiment", experiment.as_str());
    }
    if let Some(host) = &filter.host {
        query.insert("host", host.as_str());
    }

    if let Some(pattern) = &filter.job {
        validate_name_pattern(pattern)?;
        query.insert("job", doc! { "$regex": anchored(pattern) });
    }

    match filter.status {
        Some(JobStatus::Running) => {
            let cutoff = mongodb::bson::DateTime::from_chrono(stale_cutoff(
                now,
                heartbeat_interval_secs,
            ));
            query.insert("status", JobStatus::Running.as_str());
            query.insert("last_heartbeat_time", doc! { "$gte": cutoff });
        }
        Some(JobStatus::Unresponsive) => {
            let cutoff = mongodb::bson::DateTime::from_chrono(stale_cutoff(
                now,
                heartbeat_interval_secs,
            ));
            query.insert("status", JobStatus::Running.as_str());
            // $not also matches records with no heartbeat at all, which the
            // classifier reports as UNRESPONSIVE.
            query.insert("last_heartbeat_time", doc! { "$not": { "$gte": cutoff } });
        }
        Some(status) => {
            query.insert("status", status.as_str());
        }
        None => {}
    }

    Ok(query)
}
