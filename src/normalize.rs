//! Boundary validation for raw source records.
//!
//! The source collaborator returns loosely typed JSON records; nothing about
//! their shape is trusted. Every field is treated as fallible and a bad
//! record is skipped and counted rather than failing the batch.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::model::Event;

/// Outcome of normalizing one raw batch.
///
/// Invariant: `events.len() + skipped` equals the input batch length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    /// Successfully validated events.
    pub events: Vec<Event>,
    /// Number of records discarded as malformed.
    pub skipped: usize,
}

/// Convert raw source records into [`Event`]s, discarding unparsable ones.
pub fn normalize(records: &[Value]) -> NormalizedBatch {
    let mut events = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for record in records {
        match normalize_record(record) {
            Ok(event) => events.push(event),
            Err(reason) => {
                skipped += 1;
                debug!(%reason, "skipping malformed event record");
            }
        }
    }

    NormalizedBatch { events, skipped }
}

fn normalize_record(record: &Value) -> Result<Event, String> {
    let performer = required_str(record, "performer")?;
    let venue = required_str(record, "venue")?;
    let event_type = required_str(record, "event_type")?;
    let start_time = required_timestamp(record, "start_time")?;
    let end_time = required_timestamp(record, "end_time")?;

    if start_time >= end_time {
        return Err(format!(
            "start_time {start_time} is not before end_time {end_time}"
        ));
    }

    let description = record
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(Event {
        performer,
        venue,
        start_time,
        end_time,
        event_type,
        description,
    })
}

fn required_str(record: &Value, field: &str) -> Result<String, String> {
    match record.get(field).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value.to_owned()),
        Some(_) => Err(format!("field `{field}` is empty")),
        None => Err(format!("missing field `{field}`")),
    }
}

fn required_timestamp(record: &Value, field: &str) -> Result<DateTime<Utc>, String> {
    let raw = required_str(record, field)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| format!("field `{field}` is not a valid RFC 3339 timestamp: {err}"))
}
