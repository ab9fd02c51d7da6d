use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::{Client, Collection, Database};
use serde::Deserialize;

use jobwatch_core::{
    CloneConfiguration, ConfigValue, Entry, Environment, Job, JobFilter, JobStatus,
};

use crate::errors::{MetadataError, Result};
use crate::filter::{build_query, parse_object_id};
use crate::JobStore;

const JOB_COLLECTION: &str = "job";

/// Job store backed by a MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoJobStore {
    database: Database,
    collection: Collection<JobDocument>,
    heartbeat_interval_secs: u64,
}

impl MongoJobStore {
    pub async fn new(uri: &str, database: &str, heartbeat_interval_secs: u64) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        let collection = database.collection::<JobDocument>(JOB_COLLECTION);
        Ok(MongoJobStore {
            database,
            collection,
            heartbeat_interval_secs,
        })
    }
}

#[async_trait]
impl JobStore for MongoJobStore {
    async fn find_one(&self, id: &str) -> Result<Option<Job>> {
        let object_id = parse_object_id(id)?;
        let document = self.collection.find_one(doc! { "_id": object_id }).await?;
        document.map(Job::try_from).transpose()
    }

    async fn find(&self, filter: &JobFilter, now: DateTime<Utc>) -> Result<Vec<Job>> {
        let query = build_query(filter, now, self.heartbeat_interval_secs)?;

        let mut find = self
            .collection
            .find(query)
            .sort(doc! { "creation_time": -1 });
        match filter.limit {
            Some(limit) if limit > 0 => {
                find = find.limit(limit as i64);
            }
            // 0 or absent: unbounded
            _ => {}
        }

        let documents: Vec<JobDocument> = find.await?.try_collect().await?;
        documents.into_iter().map(Job::try_from).collect()
    }

    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

/// On-disk shape of a job document. Field names follow the collection;
/// mapping to the `Job` model is a pass-through concern.
#[derive(Debug, Deserialize)]
struct JobDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    user: String,
    project: String,
    experiment: String,
    job: String,
    status: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    output_dir: Option<String>,
    creation_time: mongodb::bson::DateTime,
    #[serde(default)]
    start_time: Option<mongodb::bson::DateTime>,
    #[serde(default)]
    end_time: Option<mongodb::bson::DateTime>,
    #[serde(default)]
    last_heartbeat_time: Option<mongodb::bson::DateTime>,
    #[serde(default)]
    config: Option<Document>,
    #[serde(default)]
    annotations: Option<Document>,
    #[serde(default)]
    exception: Option<String>,
    #[serde(default)]
    environment: Option<EnvironmentDocument>,
    // Legacy documents stored the environment under `initialization`.
    #[serde(default)]
    initialization: Option<EnvironmentDocument>,
    #[serde(default)]
    state: Option<StateDocument>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentDocument {
    #[serde(default)]
    script: Option<String>,
    #[serde(default)]
    clone: Option<CloneDocument>,
}

#[derive(Debug, Deserialize)]
struct CloneDocument {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StateDocument {
    #[serde(default)]
    progress: Option<f64>,
}

impl TryFrom<JobDocument> for Job {
    type Error = MetadataError;

    fn try_from(document: JobDocument) -> Result<Job> {
        let status: JobStatus = document.status.parse().map_err(|_| {
            MetadataError::MalformedRecord(format!(
                "job {} has unknown status {}",
                document.id, document.status
            ))
        })?;

        let environment = document
            .environment
            .or(document.initialization)
            .map(|env| Environment {
                script: env.script.unwrap_or_default(),
                clone: env
                    .clone
                    .and_then(|c| c.path)
                    .map(|path| CloneConfiguration { path }),
            })
            .unwrap_or_default();

        Ok(Job {
            id: document.id.to_hex(),
            user: document.user,
            project: document.project,
            experiment: document.experiment,
            job: document.job,
            status,
            host: document.host.unwrap_or_default(),
            output_directory: document.output_dir,
            creation_time: document.creation_time.to_chrono(),
            start_time: document.start_time.map(|t| t.to_chrono()),
            end_time: document.end_time.map(|t| t.to_chrono()),
            last_heartbeat_time: document.last_heartbeat_time.map(|t| t.to_chrono()),
            config: config_entries(document.config),
            annotations: annotation_entries(document.annotations),
            exception: document.exception,
            environment,
            progress: document.state.and_then(|s| s.progress),
        })
    }
}

/// Configuration values keep document order. Plain strings stay raw; any
/// other value is converted to structured JSON once, here at the boundary.
fn config_entries(config: Option<Document>) -> Vec<Entry<ConfigValue>> {
    config
        .map(|document| {
            document
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Bson::String(s) => ConfigValue::Raw(s),
                        other => ConfigValue::Structured(other.into_relaxed_extjson()),
                    };
                    Entry { key, value }
                })
                .collect()
        })
        .unwrap_or_default()
}

fn annotation_entries(annotations: Option<Document>) -> Vec<Entry<String>> {
    annotations
        .map(|document| {
            document
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Bson::String(s) => s,
                        other => other.to_string(),
                    };
                    Entry { key, value }
                })
                .collect()
        })
        .unwrap_or_default()
}
