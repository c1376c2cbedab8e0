//! Merge and sort extracted events into a single timeline.
//!
//! `es events --json >> events.json` appends one JSON array per run, so the
//! input is a sequence of concatenated JSON values rather than one document.
//! Each value is either a `{filename, url, events}` object or an array of
//! them. Events are flattened (each carrying its document's `filename` and
//! `url`) and stable-sorted by timestamp. Timestamps that cannot be parsed
//! sort first, in input order.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use std::path::Path;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%B %d, %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%Y/%m/%d",
];

const RANGE_SEPARATORS: &[&str] = &[" - ", " – ", " to ", " through "];

/// Split a file's contents into its top-level JSON values.
pub fn parse_concatenated(text: &str) -> Result<Vec<Value>> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .enumerate()
        .map(|(i, v)| v.with_context(|| format!("invalid JSON value #{}", i + 1)))
        .collect()
}

/// Flatten documents into events, attaching `filename` and `url` to each.
///
/// Top-level arrays are expanded one level. Values that are not objects, and
/// events that are not objects, are skipped.
pub fn flatten_events(values: Vec<Value>) -> Vec<Value> {
    let documents = values.into_iter().flat_map(|v| match v {
        Value::Array(items) => items,
        other => vec![other],
    });

    let mut events = Vec::new();
    for doc in documents {
        let Value::Object(doc) = doc else { continue };
        let filename = doc.get("filename").cloned().unwrap_or(Value::Null);
        let url = doc.get("url").cloned().unwrap_or(Value::Null);
        let Some(Value::Array(list)) = doc.get("events") else {
            continue;
        };
        for event in list {
            let Value::Object(fields) = event else { continue };
            let mut flat: Map<String, Value> = fields.clone();
            flat.insert("filename".to_string(), filename.clone());
            flat.insert("url".to_string(), url.clone());
            events.push(Value::Object(flat));
        }
    }
    events
}

/// Sort key for a free-form timestamp. Unparsable input maps to
/// [`NaiveDateTime::MIN`]. For a range, the start is used.
pub fn parse_timestamp(ts: &str) -> NaiveDateTime {
    parse_exact(range_start(ts.trim())).unwrap_or(NaiveDateTime::MIN)
}

fn range_start(ts: &str) -> &str {
    RANGE_SEPARATORS
        .iter()
        .find_map(|sep| ts.split_once(sep).map(|(start, _)| start.trim()))
        .unwrap_or(ts)
}

fn parse_exact(ts: &str) -> Option<NaiveDateTime> {
    if ts.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(ts, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(ts, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    // "March 2003", "2003-03"
    if let Ok(d) = NaiveDate::parse_from_str(&format!("1 {}", ts), "%d %B %Y") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", ts), "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if ts.len() == 4 && ts.bytes().all(|b| b.is_ascii_digit()) {
        let year = ts.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0);
    }
    None
}

/// Parse, flatten and sort.
pub fn build_timeline(text: &str) -> Result<Vec<Value>> {
    let mut events = flatten_events(parse_concatenated(text)?);
    events.sort_by_cached_key(|e| {
        parse_timestamp(e.get("timestamp").and_then(Value::as_str).unwrap_or(""))
    });
    Ok(events)
}

/// `es timeline <file>`: print the sorted timeline as pretty JSON.
pub fn run_timeline(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read events file: {}", path.display()))?;
    let events = build_timeline(&text)?;
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}
