//! Assertions against stored items and in-memory records.

use dynarecord_model::Item;
use serde_dynamo::to_attribute_value;
use serde_json::{Map, Value};

use crate::error::{RecordError, RecordResult};
use crate::record::ModelInstance;
use crate::store::TableStore;

/// Build a key item from `[name, value]` pairs.
///
/// Strings become `S` values and numbers `N` values.
pub fn key_from_pairs(pairs: &[(String, Value)]) -> RecordResult<Item> {
    let mut key = Item::new();
    for (name, value) in pairs {
        key.insert(name.clone(), to_attribute_value(value)?);
    }
    Ok(key)
}

/// Fail unless the table holds an item with this key.
pub async fn assert_item_present(store: &dyn TableStore, table: &str, key: Item) -> RecordResult<Item> {
    let rendered = render_key(&key);
    store.get_item(table, key).await?.ok_or_else(|| {
        RecordError::AssertionFailed(format!("table {table} has no item with key {rendered}"))
    })
}

/// Fail if the table holds an item with this key.
pub async fn assert_item_absent(store: &dyn TableStore, table: &str, key: Item) -> RecordResult<()> {
    let rendered = render_key(&key);
    match store.get_item(table, key).await? {
        None => Ok(()),
        Some(_) => Err(RecordError::AssertionFailed(format!(
            "table {table} still has an item with key {rendered}"
        ))),
    }
}

/// Fail on the first expected attribute whose value differs from the instance's.
pub fn assert_attributes_equal(instance: &ModelInstance, expected: &Map<String, Value>) -> RecordResult<()> {
    for (name, want) in expected {
        let got = instance.get(name).unwrap_or(&Value::Null);
        if !values_equal(got, want) {
            return Err(RecordError::AssertionFailed(format!(
                "attribute {name}: expected {want}, got {got}"
            )));
        }
    }
    Ok(())
}

/// Structural equality that compares numbers by value, so `1 == 1.0`.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn render_key(key: &Item) -> String {
    let mut parts: Vec<String> = key.iter().map(|(k, v)| format!("{k}={v:?}")).collect();
    parts.sort();
    parts.join(", ")
}
