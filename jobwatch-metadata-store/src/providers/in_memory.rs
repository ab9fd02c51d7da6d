use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use regex::Regex;

use jobwatch_core::{stale_cutoff, Job, JobFilter, JobStatus};

use crate::errors::{MetadataError, Result};
use crate::filter::{anchored, parse_object_id, validate_name_pattern};
use crate::JobStore;

/// In-memory job store evaluating the same listing criteria the MongoDB
/// provider translates into query documents.
/// SHOULD BE USED ONLY FOR TESTING AND LOCAL DEVELOPMENT
#[derive(Debug, Clone)]
pub struct MemoryJobStore {
    inner: Arc<DashMap<String, Job>>,
    heartbeat_interval_secs: u64,
}

impl MemoryJobStore {
    pub fn new(heartbeat_interval_secs: u64) -> Self {
        MemoryJobStore {
            inner: Arc::new(DashMap::new()),
            heartbeat_interval_secs,
        }
    }

    /// Seed a job record. Keys follow the store id format.
    pub fn insert(&self, job: Job) {
        self.inner.insert(job.id.clone(), job);
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_one(&self, id: &str) -> Result<Option<Job>> {
        parse_object_id(id)?;
        Ok(self.inner.get(id).map(|entry| entry.clone()))
    }

    async fn find(&self, filter: &JobFilter, now: DateTime<Utc>) -> Result<Vec<Job>> {
        // Validate inputs before touching any record, like the query
        // translation does for the MongoDB provider.
        if let Some(ids) = &filter.ids {
            for id in ids {
                parse_object_id(id)?;
            }
        }
        let name_pattern = filter
            .job
            .as_deref()
            .map(|pattern| {
                validate_name_pattern(pattern)?;
                Regex::new(&anchored(pattern)).map_err(|e| {
                    MetadataError::InvalidArguments(format!("invalid job name pattern: {}", e))
                })
            })
            .transpose()?;

        let cutoff = stale_cutoff(now, self.heartbeat_interval_secs);

        let mut jobs: Vec<Job> = self
            .inner
            .iter()
            .filter(|entry| {
                let job = entry.value();
                matches_ids(job, filter)
                    && matches_exact_fields(job, filter)
                    && name_pattern
                        .as_ref()
                        .map_or(true, |re| re.is_match(&job.job))
                    && matches_status(job, filter.status, cutoff)
            })
            .map(|entry| entry.value().clone())
            .collect();

        jobs.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));

        if let Some(limit) = filter.limit {
            if limit > 0 {
                jobs.truncate(limit as usize);
            }
        }

        Ok(jobs)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

fn matches_ids(job: &Job, filter: &JobFilter) -> bool {
    filter
        .ids
        .as_ref()
        .map_or(true, |ids| ids.iter().any(|id| *id == job.id))
}

fn matches_exact_fields(job: &Job, filter: &JobFilter) -> bool {
    filter.user.as_ref().map_or(true, |v| *v == job.user)
        && filter.project.as_ref().map_or(true, |v| *v == job.project)
        && filter
            .experiment
            .as_ref()
            .map_or(true, |v| *v == job.experiment)
        && filter.host.as_ref().map_or(true, |v| *v == job.host)
}

/// The same partition the classifier applies: a heartbeat at or after the
/// cutoff counts as alive, anything else (including no heartbeat) is stale.
fn matches_status(job: &Job, status: Option<JobStatus>, cutoff: DateTime<Utc>) -> bool {
    let alive = job.last_heartbeat_time.map_or(false, |hb| hb >= cutoff);
    match status {
        None => true,
        Some(JobStatus::Running) => job.status == JobStatus::Running && alive,
        Some(JobStatus::Unresponsive) => job.status == JobStatus::Running && !alive,
        Some(other) => job.status == other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use jobwatch_core::{effective_status, Environment};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn oid(n: u32) -> String {
        format!("65f0000000000000{:08x}", n)
    }

    fn job(n: u32, status: JobStatus, heartbeat_age_secs: Option<i64>) -> Job {
        Job {
            id: oid(n),
            user: "ada".to_string(),
            project: "sgd".to_string(),
            experiment: "baseline".to_string(),
            job: format!("train-{}", n),
            status,
            host: "node-7".to_string(),
            output_directory: None,
            creation_time: now() - Duration::seconds(n as i64),
            start_time: None,
            end_time: None,
            last_heartbeat_time: heartbeat_age_secs.map(|age| now() - Duration::seconds(age)),
            config: vec![],
            annotations: vec![],
            exception: None,
            environment: Environment::default(),
            progress: None,
        }
    }

    fn seeded() -> MemoryJobStore {
        let store = MemoryJobStore::new(10);
        store.insert(job(1, JobStatus::Running, Some(5)));
        store.insert(job(2, JobStatus::Running, Some(20))); // exactly at the threshold
        store.insert(job(3, JobStatus::Running, Some(45)));
        store.insert(job(4, JobStatus::Running, None));
        store.insert(job(5, JobStatus::Finished, Some(3600)));
        store.insert(job(6, JobStatus::Created, None));
        store
    }

    /// Tests the RUNNING/UNRESPONSIVE partition of stored-RUNNING jobs
    /// Purpose: the two filtered sets must be disjoint and together cover
    /// every stored-RUNNING job, splitting at the heartbeat cutoff
    /// Expected: fresh heartbeats (including exactly at the threshold) are
    /// RUNNING; stale or missing heartbeats are UNRESPONSIVE
    #[tokio::test]
    async fn running_and_unresponsive_partition_stored_running() -> Result<()> {
        let store = seeded();

        let running = store
            .find(
                &JobFilter {
                    status: Some(JobStatus::Running),
                    ..Default::default()
                },
                now(),
            )
            .await?;
        let unresponsive = store
            .find(
                &JobFilter {
                    status: Some(JobStatus::Unresponsive),
                    ..Default::default()
                },
                now(),
            )
            .await?;

        let running_ids: Vec<_> = running.iter().map(|j| j.id.clone()).collect();
        let unresponsive_ids: Vec<_> = unresponsive.iter().map(|j| j.id.clone()).collect();

        assert_eq!(running_ids, vec![oid(1), oid(2)]);
        assert_eq!(unresponsive_ids, vec![oid(3), oid(4)]);
        assert!(running_ids.iter().all(|id| !unresponsive_ids.contains(id)));
        assert_eq!(running_ids.len() + unresponsive_ids.len(), 4);

        Ok(())
    }

    /// Tests filter/classifier agreement
    /// Purpose: no record returned under a RUNNING filter may reclassify as
    /// UNRESPONSIVE, and vice versa, for any heartbeat distribution
    /// Expected: reclassifying every match yields the filtered status
    #[tokio::test]
    async fn filtered_records_reclassify_consistently() -> Result<()> {
        let store = seeded();

        for status in [JobStatus::Running, JobStatus::Unresponsive] {
            let matches = store
                .find(
                    &JobFilter {
                        status: Some(status),
                        ..Default::default()
                    },
                    now(),
                )
                .await?;
            assert!(!matches.is_empty());
            for job in matches {
                assert_eq!(
                    effective_status(job.status, job.last_heartbeat_time, now(), 10),
                    status
                );
            }
        }

        Ok(())
    }

    /// Tests plain status filters
    /// Purpose: non-derived statuses are exact matches regardless of
    /// heartbeat age
    /// Expected: FINISHED matches the finished job despite its old heartbeat
    #[tokio::test]
    async fn plain_status_is_exact_match() -> Result<()> {
        let store = seeded();
        let finished = store
            .find(
                &JobFilter {
                    status: Some(JobStatus::Finished),
                    ..Default::default()
                },
                now(),
            )
            .await?;
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].id, oid(5));
        Ok(())
    }

    /// Tests listing order and limit
    /// Purpose: results come back newest creation time first; limit 0 and
    /// absent limit are both unbounded
    /// Expected: ids ordered 1..6, truncation only for positive limits
    #[tokio::test]
    async fn listing_sorts_descending_and_limits() -> Result<()> {
        let store = seeded();

        let all = store.find(&JobFilter::default(), now()).await?;
        let ids: Vec<_> = all.iter().map(|j| j.id.clone()).collect();
        assert_eq!(ids, (1..=6).map(oid).collect::<Vec<_>>());

        let unbounded = store
            .find(
                &JobFilter {
                    limit: Some(0),
                    ..Default::default()
                },
                now(),
            )
            .await?;
        assert_eq!(unbounded.len(), 6);

        let top2 = store
            .find(
                &JobFilter {
                    limit: Some(2),
                    ..Default::default()
                },
                now(),
            )
            .await?;
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].id, oid(1));

        Ok(())
    }

    /// Tests the anchored name pattern and id list predicates
    /// Purpose: name patterns match the whole job name; id lists restrict to
    /// the given identifiers
    /// Expected: "train-[12]" matches exactly jobs 1 and 2; a partial
    /// pattern like "rain-1" matches nothing
    #[tokio::test]
    async fn name_pattern_and_ids() -> Result<()> {
        let store = seeded();

        let matched = store
            .find(
                &JobFilter {
                    job: Some("train-[12]".to_string()),
                    ..Default::default()
                },
                now(),
            )
            .await?;
        assert_eq!(matched.len(), 2);

        let unanchored = store
            .find(
                &JobFilter {
                    job: Some("rain-1".to_string()),
                    ..Default::default()
                },
                now(),
            )
            .await?;
        assert!(unanchored.is_empty());

        let by_ids = store
            .find(
                &JobFilter {
                    ids: Some(vec![oid(3), oid(5)]),
                    ..Default::default()
                },
                now(),
            )
            .await?;
        assert_eq!(by_ids.len(), 2);

        Ok(())
    }

    /// Tests malformed identifier handling
    /// Purpose: identifiers that are not valid store keys fail fast with an
    /// invalid-arguments error instead of silently matching nothing
    /// Expected: both find and find_one reject "not-hex"
    #[tokio::test]
    async fn malformed_ids_are_rejected() {
        let store = seeded();

        let err = store
            .find(
                &JobFilter {
                    ids: Some(vec!["not-hex".to_string()]),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidArguments(_)));

        let err = store.find_one("not-hex").await.unwrap_err();
        assert!(matches!(err, MetadataError::InvalidArguments(_)));
    }

    /// Tests single-job lookup
    /// Purpose: absent jobs resolve to None, not an error
    /// Expected: a well-formed unknown id returns Ok(None)
    #[tokio::test]
    async fn find_one_absent_is_none() -> Result<()> {
        let store = seeded();
        assert!(store.find_one(&oid(1)).await?.is_some());
        assert!(store.find_one(&oid(99)).await?.is_none());
        Ok(())
    }
}
