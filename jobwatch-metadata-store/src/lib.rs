mod errors;
pub use errors::MetadataError;
pub use errors::Result;

mod filter;
pub use filter::MAX_NAME_PATTERN_BYTES;

mod providers;
pub use providers::{in_memory::MemoryJobStore, mongo::MongoJobStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use jobwatch_core::{Job, JobFilter};

/// Read-only access to job records in the metadata store.
///
/// `now` is passed explicitly so the RUNNING/UNRESPONSIVE listing predicates
/// re-derive the heartbeat cutoff at the moment of the query, keeping them
/// consistent with per-record classification.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Fetch a single job by its store identifier. Absent jobs are `None`.
    async fn find_one(&self, id: &str) -> Result<Option<Job>>;

    /// List jobs matching the filter, newest creation time first.
    async fn find(&self, filter: &JobFilter, now: DateTime<Utc>) -> Result<Vec<Job>>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub enum JobStorage {
    Mongo(MongoJobStore),
    InMemory(MemoryJobStore), // InMemory is used for testing and local development
}

#[async_trait]
impl JobStore for JobStorage {
    async fn find_one(&self, id: &str) -> Result<Option<Job>> {
        match self {
            JobStorage::Mongo(store) => store.find_one(id).await,
            JobStorage::InMemory(store) => store.find_one(id).await,
        }
    }

    async fn find(&self, filter: &JobFilter, now: DateTime<Utc>) -> Result<Vec<Job>> {
        match self {
            JobStorage::Mongo(store) => store.find(filter, now).await,
            JobStorage::InMemory(store) => store.find(filter, now).await,
        }
    }

    async fn ping(&self) -> Result<()> {
        match self {
            JobStorage::Mongo(store) => store.ping().await,
            JobStorage::InMemory(store) => store.ping().await,
        }
    }
}
