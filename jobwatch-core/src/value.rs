use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A job configuration value.
///
/// Configuration entries hold arbitrary user-supplied data. Values that were
/// stored as plain strings stay strings; everything else is carried as
/// structured JSON. The conversion happens once, at the store boundary —
/// there is no opportunistic re-parsing downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Raw(String),
    Structured(Value),
}

/// A scalar cell in a time-series row: a measured field value or the
/// row timestamp in milliseconds since epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Bool(bool),
    Text(String),
    TimestampMs(i64),
}

impl FieldValue {
    /// Convert a JSON cell returned by the time-series store. Null cells
    /// (fields absent from this particular row) map to `None`.
    pub fn from_json(value: &Value) -> Option<FieldValue> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(FieldValue::Integer(i))
                } else {
                    n.as_f64().map(FieldValue::Float)
                }
            }
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            // Arrays/objects do not occur in scalar cells; keep the raw text.
            other => Some(FieldValue::Text(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_value_keeps_strings_raw() {
        let v: ConfigValue = serde_json::from_value(json!("0.01")).unwrap();
        assert_eq!(v, ConfigValue::Raw("0.01".to_string()));

        let v: ConfigValue = serde_json::from_value(json!({"lr": 0.01})).unwrap();
        assert_eq!(v, ConfigValue::Structured(json!({"lr": 0.01})));
    }

    #[test]
    fn field_value_from_json_cells() {
        assert_eq!(FieldValue::from_json(&json!(null)), None);
        assert_eq!(FieldValue::from_json(&json!(3.5)), Some(FieldValue::Float(3.5)));
        assert_eq!(FieldValue::from_json(&json!(7)), Some(FieldValue::Integer(7)));
        assert_eq!(
            FieldValue::from_json(&json!("gpu0")),
            Some(FieldValue::Text("gpu0".to_string()))
        );
    }
}
