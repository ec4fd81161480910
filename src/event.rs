use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{EventError, Result},
    validation::{is_valid_hash, is_valid_tag},
};

/// A shape-polymorphic JSON event object.
pub type Event = Map<String, Value>;

/// Ingest timestamp, RFC 3339 on the wire, microseconds at rest.
pub const TS_FIELD: &str = "_ts";
/// Client-supplied namespace identifier.
pub const TAG_FIELD: &str = "_tag";
/// Optional disambiguator for events sharing a timestamp and tag.
pub const HASH_FIELD: &str = "_hash";
/// Derived identifier, reconstructed on read and never persisted.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEventsRequest {
    pub tag: String,
    /// Carried through for future conflict detection; ingest itself is
    /// last-writer-wins per tag and does not check it.
    #[serde(default)]
    pub version: u64,
    pub events: Vec<Event>,
}

/// Extract and convert the reserved `_ts` field of an incoming event.
/// The field must be an RFC 3339 string naming an instant at or after the
/// Unix epoch; fractional seconds are truncated to microseconds.
pub fn parse_event_timestamp(event: &Event) -> Result<i64> {
    let Some(value) = event.get(TS_FIELD) else {
        return Err(EventError::InvalidTimestamp("missing _ts field".into()));
    };
    let Some(text) = value.as_str() else {
        return Err(EventError::InvalidTimestamp("_ts is not a string".into()));
    };
    let parsed = DateTime::parse_from_rfc3339(text)
        .map_err(|_| EventError::InvalidTimestamp(format!("{text:?} is not RFC 3339")))?
        .with_timezone(&Utc);
    if parsed < DateTime::UNIX_EPOCH {
        return Err(EventError::InvalidTimestamp(format!(
            "{text:?} is before the Unix epoch"
        )));
    }
    Ok(to_micros(&parsed))
}

/// The reserved `_hash` field, verbatim when present as a string, empty
/// otherwise. A present-but-non-string hash is treated as absent.
pub fn event_hash(event: &Event) -> &str {
    event
        .get(HASH_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

pub fn to_micros(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

pub fn from_micros(us: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(us).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Render a microsecond timestamp the way it appears in query results.
pub fn timestamp_value(us: i64) -> Value {
    Value::String(from_micros(us).to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// The external identifier of an event row: `ts-tag` or `ts-tag-hash`,
/// with the timestamp in decimal form.
pub fn format_event_id(ts: i64, tag: &str, hash: &str) -> String {
    if hash.is_empty() {
        format!("{ts}-{tag}")
    } else {
        format!("{ts}-{tag}-{hash}")
    }
}

/// Split a decimal-form event id into `(ts, tag, hash)`. The hash portion
/// may be absent.
pub fn parse_event_id(id: &str) -> Result<(i64, String, String)> {
    let parts: Vec<&str> = id.split('-').collect();
    let (ts_part, tag, hash) = match parts.as_slice() {
        [ts, tag] => (*ts, *tag, ""),
        [ts, tag, hash] => (*ts, *tag, *hash),
        _ => return Err(EventError::InvalidId),
    };
    let ts = ts_part.parse::<i64>().map_err(|_| EventError::InvalidId)?;
    Ok((ts, tag.to_string(), hash.to_string()))
}

/// Syntactic check of a decimal-form event id, for embedding layers that
/// accept ids before touching the store.
pub fn validate_event_id(id: &str) -> bool {
    let Ok((_, tag, hash)) = parse_event_id(id) else {
        return false;
    };
    is_valid_tag(&tag) && (hash.is_empty() || is_valid_hash(&hash))
}
