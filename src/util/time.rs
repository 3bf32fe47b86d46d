//! Time helpers.
//!
//! Timestamps are stored as naive UTC (`NaiveDateTime`), matching the relational columns.

use chrono::{NaiveDateTime, Utc};

/// Current time as naive UTC.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Score used by the time-ordered sorted set indices: Unix seconds.
pub fn score(at: NaiveDateTime) -> f64 {
    at.and_utc().timestamp() as f64
}

/// RFC 3339 rendering used in audit values.
pub fn rfc3339(at: NaiveDateTime) -> String {
    at.and_utc().to_rfc3339()
}
