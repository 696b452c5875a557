//! Conditional retrieval via `If-Modified-Since`.
//!
//! Timestamps are compared at one-second resolution. A client timestamp equal
//! to the resource's modification time still gets the full representation.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Result of evaluating a conditional request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Send the full representation (200)
    Modified,
    /// The client's copy is still valid (304)
    NotModified,
}

/// The `If-Modified-Since` value is not an HTTP date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDate(pub String);

impl std::fmt::Display for InvalidDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid If-Modified-Since value: {:?}", self.0)
    }
}

impl std::error::Error for InvalidDate {}

/// Decides whether to resend a resource last modified at `last_modified`.
///
/// `headers` must be keyed by lowercased field name.
pub fn evaluate(
    last_modified: SystemTime,
    headers: &HashMap<String, String>,
) -> Result<Freshness, InvalidDate> {
    let Some(value) = headers.get("if-modified-since") else {
        return Ok(Freshness::Modified);
    };

    let client_time = httpdate::parse_http_date(value.trim())
        .map_err(|_| InvalidDate(value.clone()))?;

    if truncate_to_seconds(client_time) <= truncate_to_seconds(last_modified) {
        Ok(Freshness::Modified)
    } else {
        Ok(Freshness::NotModified)
    }
}

/// Drops sub-second precision; times before the epoch clamp to the epoch.
pub fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}
