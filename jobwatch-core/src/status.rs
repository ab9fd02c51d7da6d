use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// How often a running job is expected to report a heartbeat, in seconds.
/// A job is considered unresponsive once two intervals pass without one.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// Lifecycle status of a job.
///
/// The first six variants are stored in the metadata store. `Unresponsive` is
/// derived at read time from a stale heartbeat and is never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    Scheduled,
    Running,
    Finished,
    Canceled,
    Failed,
    Unresponsive,
}

#[derive(Debug, Error)]
#[error("unknown job status: {0}")]
pub struct StatusParseError(String);

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "CREATED",
            JobStatus::Scheduled => "SCHEDULED",
            JobStatus::Running => "RUNNING",
            JobStatus::Finished => "FINISHED",
            JobStatus::Canceled => "CANCELED",
            JobStatus::Failed => "FAILED",
            JobStatus::Unresponsive => "UNRESPONSIVE",
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(JobStatus::Created),
            "SCHEDULED" => Ok(JobStatus::Scheduled),
            "RUNNING" => Ok(JobStatus::Running),
            "FINISHED" => Ok(JobStatus::Finished),
            "CANCELED" => Ok(JobStatus::Canceled),
            "FAILED" => Ok(JobStatus::Failed),
            "UNRESPONSIVE" => Ok(JobStatus::Unresponsive),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// The oldest heartbeat timestamp a job may carry and still count as alive.
///
/// Single source of the staleness threshold: both per-record classification
/// and the listing predicates for RUNNING/UNRESPONSIVE derive from it.
pub fn stale_cutoff(now: DateTime<Utc>, heartbeat_interval_secs: u64) -> DateTime<Utc> {
    now - Duration::seconds(2 * heartbeat_interval_secs as i64)
}

/// Derive the status presented to clients from the stored status and the
/// last recorded heartbeat.
///
/// Non-RUNNING statuses pass through unchanged. A RUNNING job whose heartbeat
/// is older than the cutoff (or missing entirely) is reported UNRESPONSIVE.
pub fn effective_status(
    stored: JobStatus,
    last_heartbeat: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    heartbeat_interval_secs: u64,
) -> JobStatus {
    if stored != JobStatus::Running {
        return stored;
    }
    match last_heartbeat {
        Some(hb) if hb >= stale_cutoff(now, heartbeat_interval_secs) => JobStatus::Running,
        _ => JobStatus::Unresponsive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    /// Non-RUNNING statuses are never reclassified, no matter how old the
    /// heartbeat is.
    #[test]
    fn non_running_passes_through() {
        let now = at(0);
        let ancient = Some(at(-3600));
        for status in [
            JobStatus::Created,
            JobStatus::Scheduled,
            JobStatus::Finished,
            JobStatus::Canceled,
            JobStatus::Failed,
        ] {
            assert_eq!(
                effective_status(status, ancient, now, DEFAULT_HEARTBEAT_INTERVAL_SECS),
                status
            );
            assert_eq!(
                effective_status(status, None, now, DEFAULT_HEARTBEAT_INTERVAL_SECS),
                status
            );
        }
    }

    /// RUNNING with a heartbeat within two intervals stays RUNNING; beyond
    /// that it becomes UNRESPONSIVE. The default 10s interval gives a 20s
    /// threshold.
    #[test]
    fn running_splits_on_heartbeat_age() {
        let now = at(0);
        assert_eq!(
            effective_status(JobStatus::Running, Some(at(-5)), now, 10),
            JobStatus::Running
        );
        assert_eq!(
            effective_status(JobStatus::Running, Some(at(-21)), now, 10),
            JobStatus::Unresponsive
        );
    }

    /// Heartbeat age exactly at the threshold still counts as alive.
    #[test]
    fn running_at_exact_threshold_is_alive() {
        let now = at(0);
        assert_eq!(
            effective_status(JobStatus::Running, Some(at(-20)), now, 10),
            JobStatus::Running
        );
    }

    /// A RUNNING job that never recorded a heartbeat is unresponsive.
    #[test]
    fn running_without_heartbeat_is_unresponsive() {
        let now = at(0);
        assert_eq!(
            effective_status(JobStatus::Running, None, now, 10),
            JobStatus::Unresponsive
        );
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            JobStatus::Created,
            JobStatus::Scheduled,
            JobStatus::Running,
            JobStatus::Finished,
            JobStatus::Canceled,
            JobStatus::Failed,
            JobStatus::Unresponsive,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("PAUSED".parse::<JobStatus>().is_err());
    }
}
