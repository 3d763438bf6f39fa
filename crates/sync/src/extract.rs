//! Field extraction over loosely-typed remote payloads.
//!
//! Remote orders arrive as partially-populated trees (JSON from Shopify, XML
//! converted to a tree for Amazon and the carriers). This module is the only
//! place that indexes into those trees. Every accessor is total: a missing
//! segment, a `null`, or a value of the wrong shape yields `None` (or the
//! supplied default), never an error or a panic.
//!
//! Paths are JSON pointers (`/ShippingAddress/Name`, `/fulfillments/0/status`),
//! so array indices and object keys share one syntax.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use serde_json::Value;

/// Key XML-derived trees use for the text of an element that has attributes.
const XML_TEXT_KEY: &str = "@value";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f %z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y"];

/// Look up `path` in `tree`. `null` counts as absent.
#[must_use]
pub fn get<'v>(tree: &'v Value, path: &str) -> Option<&'v Value> {
    tree.pointer(path).filter(|v| !v.is_null())
}

/// Look up `path` in `tree`, falling back to `default`.
#[must_use]
pub fn get_or<'v>(tree: &'v Value, path: &str, default: &'v Value) -> &'v Value {
    get(tree, path).unwrap_or(default)
}

/// Whether `path` resolves to anything other than `null`.
#[must_use]
pub fn has(tree: &Value, path: &str) -> bool {
    get(tree, path).is_some()
}

/// `None` for empty strings, empty containers, `false` and `null`.
///
/// Numeric zero is a real value and is kept.
#[must_use]
pub fn non_empty(value: &Value) -> Option<&Value> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        _ => Some(value),
    }
}

/// Scalar at `path` as a non-empty string.
///
/// Numbers are rendered in their JSON form. XML elements with attributes
/// contribute their text node.
#[must_use]
pub fn text(tree: &Value, path: &str) -> Option<String> {
    get(tree, path).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match non_empty(value)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(o) => o.get(XML_TEXT_KEY).and_then(scalar_text),
        _ => None,
    }
}

/// Upper-case an optional value.
#[must_use]
pub fn upper(value: Option<String>) -> Option<String> {
    value.map(|s| s.to_uppercase())
}

/// Lower-case an optional value.
#[must_use]
pub fn lower(value: Option<String>) -> Option<String> {
    value.map(|s| s.to_lowercase())
}

/// Text at `path`, upper-cased.
#[must_use]
pub fn upper_text(tree: &Value, path: &str) -> Option<String> {
    upper(text(tree, path))
}

/// Decimal at `path`. Accepts JSON numbers and numeric strings.
#[must_use]
pub fn decimal(tree: &Value, path: &str) -> Option<Decimal> {
    let raw = text(tree, path)?;
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Decimal at `path`, zero when absent or unparseable.
#[must_use]
pub fn amount(tree: &Value, path: &str) -> Decimal {
    decimal(tree, path).unwrap_or_default()
}

/// Integer at `path`; fractional values truncate toward zero.
#[must_use]
pub fn integer(tree: &Value, path: &str) -> Option<i64> {
    match get(tree, path)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            #[allow(clippy::cast_possible_truncation)] // truncation is the intent
            n.as_f64().map(|f| f.trunc() as i64)
        }),
        _ => {
            let raw = text(tree, path)?;
            let raw = raw.trim();
            raw.parse::<i64>().ok().or_else(|| {
                #[allow(clippy::cast_possible_truncation)] // truncation is the intent
                raw.parse::<f64>().ok().map(|f| f.trunc() as i64)
            })
        }
    }
}

/// Non-negative count at `path`, zero when absent or negative.
#[must_use]
pub fn quantity(tree: &Value, path: &str) -> u32 {
    integer(tree, path)
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(0)
}

/// Timestamp at `path`, normalized to a UTC wall-clock time.
#[must_use]
pub fn timestamp(tree: &Value, path: &str) -> Option<NaiveDateTime> {
    text(tree, path).and_then(|raw| parse_timestamp(&raw))
}

/// Parse a remote timestamp.
///
/// Timestamps with an offset are converted to UTC. Timestamps without one
/// are taken as already UTC. Bare dates map to midnight. Sub-second
/// precision is dropped to match the canonical storage format.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .ok()
        .or_else(|| {
            OFFSET_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
        })
        .map(|dt| dt.naive_utc())
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    parsed.with_nanosecond(0)
}

/// Elements at `path`, whether the tree holds a list or a single element.
///
/// XML-derived trees collapse a one-element list into the element itself.
#[must_use]
pub fn items<'v>(tree: &'v Value, path: &str) -> Vec<&'v Value> {
    match get(tree, path) {
        Some(Value::Array(list)) => list.iter().filter(|v| !v.is_null()).collect(),
        Some(single) => vec![single],
        None => Vec::new(),
    }
}

/// Every non-empty string under `path`, flattening lists and XML wrappers.
#[must_use]
pub fn strings(tree: &Value, path: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(value) = get(tree, path) {
        collect_strings(value, &mut out);
    }
    out
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(list) => list.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) if !map.contains_key(XML_TEXT_KEY) => map
            .iter()
            .filter(|(k, _)| !k.starts_with('@'))
            .for_each(|(_, v)| collect_strings(v, out)),
        other => out.extend(scalar_text(other)),
    }
}
