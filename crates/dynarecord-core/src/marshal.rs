//! Casting and (un)marshalling of attribute values by kind.
//!
//! Instance values are plain JSON in a canonical shape per kind (see
//! [`AttributeKind::cast`]). Stored values are SDK [`AttributeValue`]s,
//! converted with `serde_dynamo` except for the two set kinds, which plain
//! JSON cannot express.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use dynarecord_model::AttributeValue;
use serde_dynamo::{from_attribute_value, to_attribute_value};
use serde_json::{Number, Value};

use crate::error::{RecordError, RecordResult};
use crate::schema::AttributeKind;

impl AttributeKind {
    /// Cast a loose fixture value to the canonical value of this kind.
    ///
    /// `null` (and the empty string for scalar kinds other than strings)
    /// yields `None`, meaning the attribute is unset.
    pub fn cast(&self, attribute: &str, value: &Value) -> RecordResult<Option<Value>> {
        if value.is_null() {
            return Ok(None);
        }
        if matches!(value, Value::String(s) if s.is_empty()) && !matches!(self, Self::String) {
            return Ok(None);
        }
        let invalid = || RecordError::InvalidAttributeValue {
            attribute: attribute.to_owned(),
            kind: self.method(),
            value: value.to_string(),
        };

        let cast = match self {
            Self::String => match value {
                Value::String(_) => Some(value.clone()),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
            Self::Integer => to_integer(value).map(Value::from),
            Self::Float => to_float(value)
                .and_then(Number::from_f64)
                .map(Value::Number),
            Self::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                Value::String(s) if s == "true" => Some(Value::Bool(true)),
                Value::String(s) if s == "false" => Some(Value::Bool(false)),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Some(Value::Bool(false)),
                    Some(1) => Some(Value::Bool(true)),
                    _ => None,
                },
                _ => None,
            },
            Self::Date => value
                .as_str()
                .and_then(parse_date)
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
            Self::DateTime => to_datetime(value)
                .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
            Self::EpochTime => match value {
                Value::String(s) => s
                    .parse::<i64>()
                    .ok()
                    .or_else(|| to_datetime(value).map(|dt| dt.timestamp())),
                _ => to_integer(value),
            }
            .map(Value::from),
            Self::List => value.is_array().then(|| value.clone()),
            Self::Map => value.is_object().then(|| value.clone()),
            Self::StringSet => value.as_array().and_then(|items| {
                items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect::<Option<BTreeSet<String>>>()
                    .map(|set| Value::Array(set.into_iter().map(Value::String).collect()))
            }),
            Self::NumericSet => value.as_array().and_then(|items| {
                let mut numbers = items
                    .iter()
                    .map(|v| match v {
                        Value::Number(n) => Some(n.clone()),
                        Value::String(s) => parse_number(s),
                        _ => None,
                    })
                    .collect::<Option<Vec<Number>>>()?;
                numbers.sort_by(compare_numbers);
                numbers.dedup_by(|a, b| compare_numbers(a, b) == Ordering::Equal);
                Some(Value::Array(numbers.into_iter().map(Value::Number).collect()))
            }),
        };

        cast.map(Some).ok_or_else(invalid)
    }

    /// Marshal a canonical value into its stored form.
    ///
    /// Empty sets have no stored form and yield `None`.
    pub fn marshal(&self, value: &Value) -> RecordResult<Option<AttributeValue>> {
        let stored = match (self, value) {
            (_, Value::Null) => None,
            (Self::StringSet | Self::NumericSet, Value::Array(items)) if items.is_empty() => None,
            (Self::StringSet, Value::Array(items)) => Some(AttributeValue::Ss(
                items.iter().filter_map(Value::as_str).map(str::to_owned).collect(),
            )),
            (Self::NumericSet, Value::Array(items)) => {
                Some(AttributeValue::Ns(items.iter().map(Value::to_string).collect()))
            }
            (_, other) => Some(to_attribute_value(other)?),
        };
        Ok(stored)
    }

    /// Unmarshal a stored value back into the canonical value of this kind.
    pub fn unmarshal(&self, attribute: &str, value: &AttributeValue) -> RecordResult<Option<Value>> {
        let loose: Value = from_attribute_value(value.clone())?;
        self.cast(attribute, &loose)
    }
}

/// Parse a string-encoded number into the narrowest JSON number.
fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .map(Number::from)
        .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < 9.2e18).then(|| f.trunc() as i64)
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
    }
}
