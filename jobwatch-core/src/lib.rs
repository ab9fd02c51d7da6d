mod job;
pub use job::{CloneConfiguration, Entry, Environment, Job, JobFilter};

mod status;
pub use status::{
    effective_status, stale_cutoff, JobStatus, StatusParseError, DEFAULT_HEARTBEAT_INTERVAL_SECS,
};

mod value;
pub use value::{ConfigValue, FieldValue};
