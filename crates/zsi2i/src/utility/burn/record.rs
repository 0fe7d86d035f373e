//! # Burn Record Utilities

use burn::prelude::Backend;
use burn::record::{HalfPrecisionSettings, Record};
use serde_json::{Map, Value};

/// Summarize a module record as JSON.
///
/// Tensor payloads are replaced by ``{"_shape": [...]}``, and null / byte
/// fields are dropped; which leaves the record's parameter layout, e.g. where
/// a spectral norm keeps its raw weight and its `u` / `v` state.
pub fn record_summary<B: Backend, R: Record<B>>(record: R) -> serde_json::Result<Value> {
    let item = record.into_item::<HalfPrecisionSettings>();
    Ok(summarize_value(serde_json::to_value(&item)?))
}

/// Render [`record_summary`] as pretty JSON.
pub fn format_record<B: Backend, R: Record<B>>(record: R) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&record_summary(record)?)
}

fn numeric_array_shape(arr: &[Value]) -> Option<Vec<usize>> {
    match arr.first() {
        None => Some(vec![0]),
        Some(first) if first.is_number() => Some(vec![arr.len()]),
        Some(Value::Array(inner)) => {
            let inner_shape = numeric_array_shape(inner)?;
            Some(std::iter::once(arr.len()).chain(inner_shape).collect())
        }
        Some(_) => None,
    }
}

fn summarize_value(value: Value) -> Value {
    match value {
        Value::Array(arr) => match numeric_array_shape(&arr) {
            Some(shape) => {
                let mut obj = Map::new();
                obj.insert(
                    "_shape".to_string(),
                    Value::Array(shape.into_iter().map(Value::from).collect()),
                );
                Value::Object(obj)
            }
            None => Value::Array(arr.into_iter().map(summarize_value).collect()),
        },
        Value::Object(obj) => Value::Object(
            obj.into_iter()
                .filter(|(k, v)| k.as_str() != "bytes" && !v.is_null())
                .map(|(k, v)| {
                    let v = if k == "shape" { v } else { summarize_value(v) };
                    (k, v)
                })
                .collect(),
        ),
        v => v,
    }
}
