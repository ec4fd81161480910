//! Key codec for the two row kinds sharing the collection's key space.
//!
//! Event rows: `'e' + ts_be8 + '-' + tag + '-' + hash`. The timestamp is
//! big-endian so bytewise key order equals chronological order, with
//! `(tag, hash)` breaking ties.
//!
//! Version rows: `'v' + '-' + tag`. `'v'` sorts after `'e'`, so a range
//! scan over event rows never touches version rows.

use crate::error::{EventError, Result};

pub const EVENT_KEY_PREFIX: u8 = b'e';
pub const VERSION_KEY_PREFIX: u8 = b'v';

const KEY_SEP: u8 = b'-';
const TS_LEN: usize = 8;
// Prefix, timestamp, and at minimum the two separators of an empty tag/hash.
const MIN_EVENT_KEY_LEN: usize = 1 + TS_LEN + 2;

pub fn encode_event_key(ts: i64, tag: &str, hash: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(MIN_EVENT_KEY_LEN + tag.len() + hash.len());
    key.push(EVENT_KEY_PREFIX);
    key.extend_from_slice(&ts.to_be_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(tag.as_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(hash.as_bytes());
    key
}

pub fn decode_event_key(key: &[u8]) -> Result<(i64, String, String)> {
    if key.first() != Some(&EVENT_KEY_PREFIX) {
        return Err(EventError::InvalidId);
    }
    if key.len() < MIN_EVENT_KEY_LEN {
        return Err(EventError::InvalidId);
    }

    let mut ts_bytes = [0u8; TS_LEN];
    ts_bytes.copy_from_slice(&key[1..1 + TS_LEN]);
    let ts = i64::from_be_bytes(ts_bytes);

    if key[1 + TS_LEN] != KEY_SEP {
        return Err(EventError::InvalidId);
    }

    let trailer = std::str::from_utf8(&key[1 + TS_LEN + 1..]).map_err(|_| EventError::InvalidId)?;
    let parts: Vec<&str> = trailer.split('-').collect();
    if parts.len() != 2 {
        return Err(EventError::InvalidId);
    }

    Ok((ts, parts[0].to_string(), parts[1].to_string()))
}

pub fn encode_version_key(tag: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + tag.len());
    key.push(VERSION_KEY_PREFIX);
    key.push(KEY_SEP);
    key.extend_from_slice(tag.as_bytes());
    key
}

/// Bounds for a range scan over `[start_us, end_us]`. The trailing `0xFF`
/// on the end key keeps every event key whose timestamp equals `end_us`
/// inside the range regardless of tag and hash.
pub fn encode_range_bounds(start_us: i64, end_us: i64) -> (Vec<u8>, Vec<u8>) {
    let mut start = Vec::with_capacity(1 + TS_LEN);
    start.push(EVENT_KEY_PREFIX);
    start.extend_from_slice(&start_us.to_be_bytes());

    let mut end = Vec::with_capacity(1 + TS_LEN + 1);
    end.push(EVENT_KEY_PREFIX);
    end.extend_from_slice(&end_us.to_be_bytes());
    end.push(0xFF);

    (start, end)
}
