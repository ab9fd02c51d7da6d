use std::collections::HashMap;

use jobwatch_core::FieldValue;

use crate::client::ResultGroup;
use crate::query::AggregateOp;

const TIME_COLUMN: &str = "time";
const NANOS_PER_MILLI: i64 = 1_000_000;

/// Series identifiers from a discovery result: one per row, in the store's
/// `key` column. Zero groups means zero series.
pub fn series_keys(groups: &[ResultGroup]) -> Vec<String> {
    let Some(group) = groups.first() else {
        return Vec::new();
    };
    let key_index = group
        .columns
        .iter()
        .position(|column| column == "key")
        .unwrap_or(0);
    group
        .values
        .iter()
        .filter_map(|row| row.get(key_index))
        .filter_map(|cell| cell.as_str().map(str::to_string))
        .collect()
}

/// Field mappings for every row of a raw value query.
///
/// The group's tag columns are excluded — only measured fields remain — and
/// the `time` column is converted from store-native nanoseconds to
/// milliseconds since epoch.
pub fn raw_rows(groups: &[ResultGroup]) -> Vec<HashMap<String, FieldValue>> {
    let Some(group) = groups.first() else {
        return Vec::new();
    };
    group
        .values
        .iter()
        .map(|row| {
            let mut fields = HashMap::new();
            for (column, cell) in group.columns.iter().zip(row) {
                if group.tags.contains_key(column) {
                    continue;
                }
                if column == TIME_COLUMN {
                    if let Some(nanos) = cell.as_i64() {
                        fields.insert(
                            column.clone(),
                            FieldValue::TimestampMs(nanos / NANOS_PER_MILLI),
                        );
                    }
                } else if let Some(value) = FieldValue::from_json(cell) {
                    fields.insert(column.clone(), value);
                }
            }
            fields
        })
        .collect()
}

/// Field mappings for an aggregate query's rows.
///
/// The store names aggregate columns `<op>_<field>`; extraction keeps only
/// columns carrying that exact prefix and strips it (operator name plus one
/// delimiter), dropping anything else — tag columns, `time`, or unrelated
/// columns that merely share leading characters with the operator.
pub fn aggregate_rows(groups: &[ResultGroup], op: AggregateOp) -> Vec<HashMap<String, FieldValue>> {
    let Some(group) = groups.first() else {
        return Vec::new();
    };
    let prefix = format!("{}_", op.field_prefix());
    group
        .values
        .iter()
        .map(|row| {
            let mut fields = HashMap::new();
            for (column, cell) in group.columns.iter().zip(row) {
                let Some(field) = column.strip_prefix(&prefix) else {
                    continue;
                };
                if let Some(value) = FieldValue::from_json(cell) {
                    fields.insert(field.to_string(), value);
                }
            }
            fields
        })
        .collect()
}
