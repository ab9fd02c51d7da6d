mod errors;
pub use errors::Result;
pub use errors::TimeseriesError;

mod client;
pub use client::{ResultGroup, TimeseriesClient, TimeseriesConfig};

mod query;
pub use query::{AggregateOp, SeriesQuery};

mod series;
pub use series::{parse_series, SeriesDescriptor, RESERVED_TAGS};

mod rows;
pub use rows::{aggregate_rows, raw_rows, series_keys};
