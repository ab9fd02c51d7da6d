use crate::errors::{Result, TimeseriesError};

/// Scalar aggregate operators supported per series.
///
/// The store names aggregate result columns `<operator>_<field>`, with the
/// operator lowercased; `field_prefix` is that naming convention's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Last,
    Max,
    Min,
}

impl AggregateOp {
    pub fn function(&self) -> &'static str {
        match self {
            AggregateOp::Last => "LAST",
            AggregateOp::Max => "MAX",
            AggregateOp::Min => "MIN",
        }
    }

    pub fn field_prefix(&self) -> &'static str {
        match self {
            AggregateOp::Last => "last",
            AggregateOp::Max => "max",
            AggregateOp::Min => "min",
        }
    }
}

/// Builder for the three per-job query shapes: series discovery, raw value
/// listing and scalar aggregates.
///
/// Conditions are held as bound values and only rendered on output, with
/// delimiters escaped, so a tag value containing a quote cannot break out of
/// its literal.
#[derive(Debug, Clone)]
pub struct SeriesQuery {
    job_id: String,
    measurement: Option<String>,
    tags: Vec<(String, String)>,
}

impl SeriesQuery {
    pub fn for_job(job_id: &str) -> Self {
        SeriesQuery {
            job_id: job_id.to_string(),
            measurement: None,
            tags: Vec::new(),
        }
    }

    pub fn with_measurement(mut self, measurement: &str) -> Self {
        self.measurement = Some(measurement.to_string());
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    /// Add tag equality clauses from a `key=value,key2=value2` request
    /// string. Empty segments contribute nothing; a segment without `=` or
    /// with an empty key fails fast before any store call.
    pub fn with_tag_filter(mut self, raw: &str) -> Result<Self> {
        for token in raw.split(',').filter(|token| !token.is_empty()) {
            let (key, value) = token.split_once('=').ok_or_else(|| {
                TimeseriesError::InvalidArguments(format!(
                    "tag filter segment is not key=value: {}",
                    token
                ))
            })?;
            if key.is_empty() {
                return Err(TimeseriesError::InvalidArguments(format!(
                    "tag filter segment has an empty key: {}",
                    token
                )));
            }
            self.tags.push((key.to_string(), value.to_string()));
        }
        Ok(self)
    }

    /// `SHOW SERIES` restricted to this job, optionally narrowed to
    /// measurements matching a pattern.
    pub fn discovery(&self) -> String {
        let mut statement = String::from("SHOW SERIES");
        if let Some(measurement) = &self.measurement {
            statement.push_str(&format!(" FROM /{}/", escape_regex(measurement)));
        }
        statement.push_str(&format!(" WHERE {}", self.where_clause()));
        statement
    }

    /// `SELECT *::field` over one measurement, grouped by the full tag set.
    pub fn raw_values(&self) -> Result<String> {
        let measurement = self.measurement_required()?;
        Ok(format!(
            "SELECT *::field FROM {} WHERE {} GROUP BY *",
            quote_identifier(measurement),
            self.where_clause()
        ))
    }

    /// `SELECT <OP>(*::field)` over one measurement, grouped by the full
    /// tag set.
    pub fn aggregate(&self, op: AggregateOp) -> Result<String> {
        let measurement = self.measurement_required()?;
        Ok(format!(
            "SELECT {}(*::field) FROM {} WHERE {} GROUP BY *",
            op.function(),
            quote_identifier(measurement),
            self.where_clause()
        ))
    }

    fn measurement_required(&self) -> Result<&str> {
        self.measurement
            .as_deref()
            .ok_or_else(|| TimeseriesError::InvalidArguments("measurement is required".to_string()))
    }

    fn where_clause(&self) -> String {
        let mut clauses = vec![format!("job_id = {}", quote_literal(&self.job_id))];
        for (key, value) in &self.tags {
            clauses.push(format!(
                "{} = {}",
                quote_identifier(key),
                quote_literal(value)
            ));
        }
        clauses.join(" AND ")
    }
}

/// Single-quoted string literal with `\` and `'` escaped.
fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Double-quoted identifier with `\` and `"` escaped.
fn quote_identifier(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Regex pattern body with the `/` delimiter escaped.
fn escape_regex(pattern: &str) -> String {
    pattern.replace('/', "\\/")
}
