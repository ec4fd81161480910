//! Single-pass query evaluation over a collection's key range.
//!
//! One forward cursor walk produces all three result shapes: grouped
//! summary rows, time-bucketed series rows, and raw events. Grouping keys
//! are the JSON encodings of the group-by values joined by `0x00`, which
//! keeps booleans, numbers, and strings distinguishable (JSON encodings
//! never contain an unescaped `0x00`).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    compare::{compare_values, values_equal},
    error::{EventError, Result},
    event::{
        format_event_id, timestamp_value, to_micros, Event, HASH_FIELD, ID_FIELD, TAG_FIELD,
        TS_FIELD,
    },
    key::{decode_event_key, encode_range_bounds},
    store::EventCollection,
};

const ROW_KEY_SEP: &str = "\0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDesc {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnDesc>,
    #[serde(default)]
    pub time_range: TimeRange,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    /// Microsecond width of a series time bucket; zero disables series
    /// output.
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub point_size: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<String>,
    #[serde(default)]
    pub descending: bool,
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDesc {
    pub name: String,
    /// One of `sum`, `count`, `min`, `max`, or empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aggregate: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            start: DateTime::UNIX_EPOCH,
            end: DateTime::UNIX_EPOCH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    /// `eq` or `neq`; anything else fails the query.
    pub condition: String,
    pub value: Value,
}

impl Filter {
    /// Build an equality filter from a `column=value` argument string.
    /// The input must contain exactly one `=`.
    pub fn parse(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.split('=').collect();
        let [column, value] = parts.as_slice() else {
            return Err(EventError::InvalidFilter(input.to_string()));
        };
        Ok(Self {
            column: column.to_string(),
            condition: "eq".to_string(),
            value: Value::String(value.to_string()),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub summary: Vec<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
    pub query: QueryDesc,
}

type AggregateVector = Vec<f64>;

#[derive(Default)]
struct ScanState {
    summary_rows: BTreeMap<String, AggregateVector>,
    series_rows: BTreeMap<i64, BTreeMap<String, AggregateVector>>,
    events: Vec<Event>,
}

impl EventCollection {
    /// Evaluate `desc` in a single forward pass over the event key range.
    pub fn query(&self, desc: QueryDesc) -> Result<QueryResult> {
        let start_us = to_micros(&desc.time_range.start);
        let mut end_us = to_micros(&desc.time_range.end);
        if desc.time_range == TimeRange::default() {
            // Epoch-to-epoch means an open-ended upper bound.
            end_us = i64::MAX;
        }

        let (start_key, end_key) = encode_range_bounds(start_us, end_us);
        let mut state = ScanState::default();

        let mut cursor = self.db.raw_iterator();
        cursor.seek(&start_key);
        while cursor.valid() {
            let (Some(key), Some(value)) = (cursor.key(), cursor.value()) else {
                break;
            };
            if key > end_key.as_slice() {
                break;
            }
            // Reserved namespace for collection metadata.
            if key.first() == Some(&b'_') {
                cursor.next();
                continue;
            }

            scan_entry(&desc, start_us, key, value, &mut state)?;
            cursor.next();
        }
        cursor
            .status()
            .map_err(|err| EventError::ReadFailed(err.to_string()))?;

        let mut summary: Vec<Event> = state
            .summary_rows
            .iter()
            .map(|(row_key, aggregates)| summary_event(&desc, row_key, aggregates))
            .collect();

        order_events(&desc, &mut summary);
        if desc.limit > 0 && summary.len() > desc.limit {
            summary.truncate(desc.limit);
        }

        let series = series_events(&desc, &state.series_rows);

        Ok(QueryResult {
            summary,
            series,
            events: state.events,
            query: desc,
        })
    }
}

/// Decode one cursor entry, apply filters, and route the event into raw
/// results, summary rows, and series buckets.
fn scan_entry(
    desc: &QueryDesc,
    start_us: i64,
    key: &[u8],
    value: &[u8],
    state: &mut ScanState,
) -> Result<()> {
    let (ts, tag, hash) = decode_event_key(key).inspect_err(|err| {
        warn!(%err, "undecodable key in event range");
    })?;

    // The seek may land on a tie-break before the range start.
    if ts < start_us {
        return Ok(());
    }

    let mut event: Event = serde_json::from_slice(value).inspect_err(|err| {
        warn!(%err, ts, tag = %tag, "undecodable event row");
    })?;

    let id = format_event_id(ts, &tag, &hash);
    event.insert(TS_FIELD.to_string(), Value::from(ts));
    event.insert(TAG_FIELD.to_string(), Value::String(tag));
    if !hash.is_empty() {
        event.insert(HASH_FIELD.to_string(), Value::String(hash));
    }
    event.insert(ID_FIELD.to_string(), Value::String(id));

    for filter in &desc.filters {
        let Some(column_value) = event.get(&filter.column) else {
            return Ok(());
        };
        let keep = match filter.condition.as_str() {
            "eq" => values_equal(column_value, &filter.value),
            "neq" => !values_equal(column_value, &filter.value),
            other => return Err(EventError::InvalidCondition(other.to_string())),
        };
        if !keep {
            return Ok(());
        }
    }

    if desc.group_by.is_empty() && desc.columns.is_empty() && desc.point_size <= 0 {
        event.insert(TS_FIELD.to_string(), timestamp_value(ts));
        state.events.push(event);
        return Ok(());
    }

    let Some(row_key) = group_row_key(&desc.group_by, &event) else {
        return Ok(());
    };

    if !desc.columns.is_empty() {
        let row = state
            .summary_rows
            .entry(row_key.clone())
            .or_insert_with(|| new_aggregate_vector(desc.columns.len()));
        update_aggregates(row, &desc.columns, &event);
    }

    if desc.point_size > 0 {
        let bucket = ts / desc.point_size;
        let row = state
            .series_rows
            .entry(bucket)
            .or_default()
            .entry(row_key)
            .or_insert_with(|| new_aggregate_vector(desc.columns.len()));
        update_aggregates(row, &desc.columns, &event);
    }

    Ok(())
}

/// Concatenate the JSON encodings of the group-by values. `None` drops the
/// event: a group column that is absent, null, or unencodable contributes
/// to no row.
fn group_row_key(group_by: &[String], event: &Event) -> Option<String> {
    if group_by.is_empty() {
        return Some(String::new());
    }
    let mut parts = Vec::with_capacity(group_by.len());
    for column in group_by {
        let value = event.get(column)?;
        if value.is_null() {
            return None;
        }
        parts.push(serde_json::to_string(value).ok()?);
    }
    Some(parts.join(ROW_KEY_SEP))
}

fn new_aggregate_vector(len: usize) -> AggregateVector {
    vec![f64::NAN; len]
}

fn update_aggregates(row: &mut AggregateVector, columns: &[ColumnDesc], event: &Event) {
    for (slot, column) in row.iter_mut().zip(columns) {
        let value = numeric_value(event.get(&column.name));
        match column.aggregate.as_str() {
            "sum" => {
                if slot.is_nan() {
                    *slot = 0.0;
                }
                *slot += value;
            }
            "count" => {
                if slot.is_nan() {
                    *slot = 0.0;
                }
                *slot += 1.0;
            }
            "min" => {
                if slot.is_nan() || *slot > value {
                    *slot = value;
                }
            }
            "max" => {
                if slot.is_nan() || *slot < value {
                    *slot = value;
                }
            }
            _ => {}
        }
    }
}

fn numeric_value(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

fn summary_event(desc: &QueryDesc, row_key: &str, aggregates: &[f64]) -> Event {
    let mut event = Event::new();
    if !desc.group_by.is_empty() {
        for (column, part) in desc.group_by.iter().zip(row_key.split(ROW_KEY_SEP)) {
            if column == TS_FIELD {
                let ts = part.parse::<i64>().unwrap_or_default();
                event.insert(TS_FIELD.to_string(), timestamp_value(ts));
                continue;
            }
            event.insert(column.clone(), decode_row_key_part(part));
        }
    }
    append_aggregate_fields(&mut event, &desc.columns, aggregates);
    event
}

fn series_events(
    desc: &QueryDesc,
    series_rows: &BTreeMap<i64, BTreeMap<String, AggregateVector>>,
) -> Vec<Event> {
    let mut series = Vec::new();
    // Bucket iteration is already ascending, so the series arrives sorted
    // by `_ts`.
    for (bucket, rows) in series_rows {
        for (row_key, aggregates) in rows {
            let mut event = Event::new();
            event.insert(
                TS_FIELD.to_string(),
                timestamp_value(bucket * desc.point_size),
            );
            if !desc.group_by.is_empty() {
                for (column, part) in desc.group_by.iter().zip(row_key.split(ROW_KEY_SEP)) {
                    // The bucket timestamp supersedes a `_ts` group column.
                    if column == TS_FIELD {
                        continue;
                    }
                    event.insert(column.clone(), decode_row_key_part(part));
                }
            }
            append_aggregate_fields(&mut event, &desc.columns, aggregates);
            series.push(event);
        }
    }
    series
}

/// Number-preserving decode of one row-key part; integers stay integers.
fn decode_row_key_part(part: &str) -> Value {
    serde_json::from_str(part).unwrap_or(Value::Null)
}

fn append_aggregate_fields(event: &mut Event, columns: &[ColumnDesc], aggregates: &[f64]) {
    for (column, value) in columns.iter().zip(aggregates) {
        let field = format!("{}({})", column.aggregate, column.name);
        // NaN slots (no contribution) surface as null.
        event.insert(field, Value::from(*value));
    }
}

/// Stable ordering of summary events by the named columns. An event
/// missing a sort column compares greater than everything, so it sinks in
/// ascending order. The value comparator is not a total order, so this is
/// an insertion sort rather than a std sort.
fn order_events(desc: &QueryDesc, events: &mut [Event]) {
    if desc.order_by.is_empty() {
        return;
    }
    for i in 1..events.len() {
        let mut j = i;
        while j > 0 && ordered_before(desc, &events[j], &events[j - 1]) {
            events.swap(j, j - 1);
            j -= 1;
        }
    }
}

fn ordered_before(desc: &QueryDesc, a: &Event, b: &Event) -> bool {
    let (a, b) = if desc.descending { (b, a) } else { (a, b) };
    for column in &desc.order_by {
        let ordering = match (a.get(column), b.get(column)) {
            (Some(lhs), Some(rhs)) => compare_values(lhs, rhs),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Less {
            return false;
        }
    }
    true
}

fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

fn is_zero_usize(value: &usize) -> bool {
    *value == 0
}
