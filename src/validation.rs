use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{EventError, Result};

pub const MAX_TAG_LENGTH: usize = 256;
pub const MAX_HASH_LENGTH: usize = 16;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_./]{1,256}$").expect("valid tag regex"));
static HASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{1,16}$").expect("valid hash regex"));

/// A tag names the namespace an event row belongs to and owns the tag's
/// version counter. Tags are limited to `[A-Za-z0-9_./]` so they never
/// collide with the `-` separators inside encoded keys.
pub fn is_valid_tag(value: &str) -> bool {
    TAG_RE.is_match(value)
}

pub fn is_valid_hash(value: &str) -> bool {
    HASH_RE.is_match(value)
}

pub fn ensure_tag(value: &str) -> Result<()> {
    if is_valid_tag(value) {
        Ok(())
    } else {
        Err(EventError::InvalidTag(value.to_string()))
    }
}
