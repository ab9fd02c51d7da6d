use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::{Result, TimeseriesError};

/// Structural/join tag names the ingestion side attaches to every series.
/// They establish scope, not description, and are stripped during parsing.
pub const RESERVED_TAGS: [&str; 7] = [
    "experiment",
    "host",
    "influxdb_database",
    "job",
    "job_id",
    "project",
    "user",
];

/// One discovered series: a measurement plus its descriptive tags, scoped to
/// a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDescriptor {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub job_id: String,
}

/// Parse a flat series identifier (`measurement,key=value,...`) as returned
/// by series discovery.
///
/// The job id comes from the enclosing query context, not from the string —
/// the caller supplies it. Reserved tags are dropped.
pub fn parse_series(identifier: &str, job_id: &str) -> Result<SeriesDescriptor> {
    let mut tokens = identifier.split(',');

    let measurement = match tokens.next() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => {
            return Err(TimeseriesError::ParseError(format!(
                "series identifier has no measurement: {}",
                identifier
            )))
        }
    };

    let mut tags = BTreeMap::new();
    for token in tokens {
        let (key, value) = token.split_once('=').ok_or_else(|| {
            TimeseriesError::ParseError(format!(
                "series tag is not key=value: {} in {}",
                token, identifier
            ))
        })?;
        if key.is_empty() {
            return Err(TimeseriesError::ParseError(format!(
                "series tag has an empty key: {} in {}",
                token, identifier
            )));
        }
        if RESERVED_TAGS.contains(&key) {
            continue;
        }
        tags.insert(key.to_string(), value.to_string());
    }

    Ok(SeriesDescriptor {
        measurement,
        tags,
        job_id: job_id.to_string(),
    })
}
